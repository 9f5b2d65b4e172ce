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

use super::{ChatMessage, ChatResponse, LLMError, LLMProvider};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use serde_json::json;
use std::time::Duration;

// Extraction and assistant replies are parsed as JSON, so all providers
// run with temperature 0.
const CHAT_TEMPERATURE: f32 = 0.0;

// OpenAI Provider
pub struct OpenAIProvider {
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = OpenAIClient::with_config(config);
        Self { client }
    }

    fn convert_messages(&self, messages: Vec<ChatMessage>) -> Vec<ChatCompletionRequestMessage> {
        messages
            .into_iter()
            .filter_map(|msg| match msg.role.as_str() {
                "system" => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::System),
                "user" => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::User),
                "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::Assistant),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, model: &str) -> Result<ChatResponse, LLMError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(CHAT_TEMPERATURE)
            .messages(self.convert_messages(messages))
            .build()
            .map_err(|e| LLMError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LLMError::Provider(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LLMError::InvalidResponse("empty completion".to_string()))?;

        Ok(ChatResponse {
            content,
            model: model.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }
}

// Anthropic Provider
pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

/// Build the Anthropic request body. The Messages API takes system prompts
/// as a top-level field, not as a message role.
fn anthropic_body(messages: &[ChatMessage], model: &str) -> serde_json::Value {
    let system = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let formatted_messages: Vec<_> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": formatted_messages,
        "max_tokens": 4096,
        "temperature": CHAT_TEMPERATURE,
    });
    if !system.is_empty() {
        body["system"] = json!(system);
    }
    body
}

#[async_trait::async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, model: &str) -> Result<ChatResponse, LLMError> {
        let body = anthropic_body(&messages, model);

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider(format!(
                "Anthropic returned {status}: {detail}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("missing content[0].text".to_string()))?
            .to_string();

        Ok(ChatResponse {
            content,
            model: model.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }
}

// Ollama Provider (local)
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl LLMProvider for OllamaProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, model: &str) -> Result<ChatResponse, LLMError> {
        let formatted_messages: Vec<_> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let body = json!({
            "model": model,
            "messages": formatted_messages,
            "stream": false,
            "options": {"temperature": CHAT_TEMPERATURE},
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LLMError::Provider(format!(
                "Ollama returned {status}: {detail}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("missing message.content".to_string()))?
            .to_string();

        Ok(ChatResponse {
            content,
            model: model.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "Ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_messages_drops_unknown_roles() {
        let provider = OpenAIProvider::new("test-key".to_string());
        let converted = provider.convert_messages(vec![
            ChatMessage::system("s"),
            ChatMessage::user("u"),
            ChatMessage::assistant("a"),
            ChatMessage {
                role: "tool".to_string(),
                content: "ignored".to_string(),
            },
        ]);
        assert_eq!(converted.len(), 3);
    }

    #[test]
    fn test_anthropic_body_hoists_system_prompt() {
        let messages = vec![
            ChatMessage::system("roster"),
            ChatMessage::user("who does fintech?"),
            ChatMessage::assistant("checking"),
        ];
        let body = anthropic_body(&messages, "claude-3-5-haiku-latest");

        assert_eq!(body["system"], "roster");
        assert_eq!(body["model"], "claude-3-5-haiku-latest");
        let sent = body["messages"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["role"], "user");
        assert_eq!(sent[1]["role"], "assistant");
    }

    #[test]
    fn test_anthropic_body_without_system_prompt() {
        let body = anthropic_body(&[ChatMessage::user("hi")], "m");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_ollama_base_url_trailing_slash_trimmed() {
        let provider = OllamaProvider::new(
            "http://localhost:11434/".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(provider.base_url, "http://localhost:11434");
    }
}
