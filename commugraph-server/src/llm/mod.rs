// Copyright 2025 Commugraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! LLM provider integration for profile extraction and assistant chat.
//!
//! Providers register with the manager at startup based on which
//! credentials are present in the configuration. All requests go through
//! the single configured default provider and model.

use crate::config::LLMConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

mod providers;

pub use providers::{AnthropicProvider, OllamaProvider, OpenAIProvider};

/// Chat message for LLM providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM provider \"{0}\" is not configured")]
    NotConfigured(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("malformed LLM response: {0}")]
    InvalidResponse(String),
}

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(&self, messages: Vec<ChatMessage>, model: &str) -> Result<ChatResponse, LLMError>;

    /// Provider name
    fn name(&self) -> &'static str;
}

/// Manager for multiple LLM providers
pub struct LLMProviderManager {
    providers: DashMap<String, Arc<dyn LLMProvider>>,
    default_provider: String,
    default_model: String,
}

impl LLMProviderManager {
    /// Build the manager from configuration, registering every provider
    /// whose credentials are present.
    pub fn new(config: &LLMConfig) -> Self {
        let manager = Self {
            providers: DashMap::new(),
            default_provider: config.provider.clone(),
            default_model: config.model.clone(),
        };
        let timeout = Duration::from_secs(config.request_timeout_secs);

        if let Some(api_key) = &config.openai_api_key {
            manager.register_provider("openai", Arc::new(OpenAIProvider::new(api_key.clone())));
            info!("Initialized OpenAI provider");
        } else {
            warn!("OPENAI_API_KEY not set, OpenAI provider disabled");
        }

        if let Some(api_key) = &config.anthropic_api_key {
            manager.register_provider(
                "anthropic",
                Arc::new(AnthropicProvider::new(api_key.clone(), timeout)),
            );
            info!("Initialized Anthropic provider");
        } else {
            warn!("ANTHROPIC_API_KEY not set, Anthropic provider disabled");
        }

        if let Some(base_url) = &config.ollama_base_url {
            manager.register_provider(
                "ollama",
                Arc::new(OllamaProvider::new(base_url.clone(), timeout)),
            );
            info!("Initialized Ollama provider at {}", base_url);
        } else {
            warn!("OLLAMA_BASE_URL not set, Ollama provider disabled");
        }

        manager
    }

    /// Register a provider under a name, replacing any existing one
    pub fn register_provider(&self, name: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Whether the configured default provider has been registered
    pub fn is_configured(&self) -> bool {
        self.providers.contains_key(&self.default_provider)
    }

    /// Names of all registered providers
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Route a chat request to the configured default provider and model
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, LLMError> {
        let provider = self
            .providers
            .get(&self.default_provider)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LLMError::NotConfigured(self.default_provider.clone()))?;
        provider.chat(messages, &self.default_model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl LLMProvider for EchoProvider {
        async fn chat(
            &self,
            messages: Vec<ChatMessage>,
            model: &str,
        ) -> Result<ChatResponse, LLMError> {
            let content = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse {
                content,
                model: model.to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn empty_config() -> LLMConfig {
        LLMConfig {
            provider: "echo".to_string(),
            model: "echo-1".to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_base_url: None,
            request_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_an_error() {
        let manager = LLMProviderManager::new(&empty_config());
        assert!(!manager.is_configured());

        let err = manager
            .chat(vec![ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::NotConfigured(name) if name == "echo"));
    }

    #[tokio::test]
    async fn test_chat_routes_to_default_provider_and_model() {
        let manager = LLMProviderManager::new(&empty_config());
        manager.register_provider("echo", Arc::new(EchoProvider));
        assert!(manager.is_configured());

        let response = manager
            .chat(vec![ChatMessage::system("sys"), ChatMessage::user("question")])
            .await
            .unwrap();
        assert_eq!(response.content, "question");
        assert_eq!(response.model, "echo-1");
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
        assert_eq!(ChatMessage::assistant("c").role, "assistant");
    }
}
