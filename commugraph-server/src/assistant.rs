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

//! Community Assistant
//!
//! Chat over the imported member roster. Every request rebuilds the system
//! prompt from the current profiles, forwards the trailing conversation
//! window to the LLM and parses the reply into text plus the profile ids
//! it references. Ids the model invents are dropped.

use crate::llm::{ChatMessage, LLMError, LLMProviderManager};
use commugraph_core::{Profile, ProfileFilter, ProfileId};
use commugraph_storage::{SqliteStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Messages forwarded to the LLM per request, newest kept.
const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("no profiles imported yet")]
    EmptyRoster,

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed assistant response: {0}")]
    Malformed(String),
}

/// Parsed assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub reply: String,
    /// Profiles the answer refers to, validated against the roster
    pub related_profile_ids: Vec<ProfileId>,
}

pub struct Assistant {
    store: Arc<SqliteStore>,
    llm: Arc<LLMProviderManager>,
}

impl Assistant {
    pub fn new(store: Arc<SqliteStore>, llm: Arc<LLMProviderManager>) -> Self {
        Self { store, llm }
    }

    /// Answer a conversation turn against the current roster.
    pub async fn respond(&self, messages: Vec<ChatMessage>) -> Result<AssistantReply, AssistantError> {
        let profiles = self.store.list_profiles(&ProfileFilter::default())?;
        if profiles.is_empty() {
            return Err(AssistantError::EmptyRoster);
        }

        let mut chat = Vec::with_capacity(messages.len().min(HISTORY_LIMIT) + 1);
        chat.push(ChatMessage::system(build_roster_prompt(&profiles)));
        let start = messages.len().saturating_sub(HISTORY_LIMIT);
        chat.extend(messages.into_iter().skip(start));

        let response = self.llm.chat(chat).await?;
        let raw = parse_assistant_response(&response.content)?;

        let known: HashSet<ProfileId> = profiles.iter().map(|p| p.id).collect();
        let mut seen = HashSet::new();
        let related_profile_ids: Vec<ProfileId> = raw
            .related_profile_ids
            .iter()
            .filter_map(parse_profile_id)
            .filter(|id| known.contains(id) && seen.insert(*id))
            .collect();

        debug!(
            related = related_profile_ids.len(),
            "Assistant reply parsed"
        );
        Ok(AssistantReply {
            reply: raw.reply,
            related_profile_ids,
        })
    }
}

/// System prompt: the full roster plus the response contract.
fn build_roster_prompt(profiles: &[Profile]) -> String {
    let mut roster = String::new();
    for profile in profiles {
        let _ = writeln!(
            roster,
            "ID: {}\nName: {}\nCluster: {}\nSummary: {}\nGoal: {}\nTags: {}\n",
            profile.id,
            profile.name,
            profile.cluster,
            profile.summary,
            profile.goal,
            profile.tags.join(", ")
        );
    }

    format!(
        r#"You are the assistant of a business community. You answer questions about the members listed below and suggest who to talk to. Answer in the language the user writes in.

## MEMBERS
{roster}
## OUTPUT
Return ONLY a valid JSON object, no markdown code blocks, no explanation:
{{"reply": "<your answer>", "related_profile_ids": [<ids of members the answer mentions>]}}"#
    )
}

#[derive(Debug, Deserialize)]
struct RawAssistantResponse {
    reply: String,
    #[serde(default)]
    related_profile_ids: Vec<serde_json::Value>,
}

fn parse_assistant_response(content: &str) -> Result<RawAssistantResponse, AssistantError> {
    let json_start = content.find('{');
    let json_end = content.rfind('}');

    let json_str = match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => {
            warn!("No JSON object found in assistant response");
            return Err(AssistantError::Malformed(
                "no JSON object in response".to_string(),
            ));
        }
    };

    serde_json::from_str(json_str)
        .map_err(|e| AssistantError::Malformed(format!("failed to parse reply JSON: {e}")))
}

/// Models return ids as numbers or strings interchangeably.
fn parse_profile_id(value: &serde_json::Value) -> Option<ProfileId> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMConfig;
    use crate::llm::{ChatResponse, LLMProvider};
    use commugraph_core::Vocabulary;
    use serde_json::json;

    /// Provider that returns a fixed body and records the last request.
    struct FixedProvider {
        body: String,
        last_messages: std::sync::Mutex<Vec<ChatMessage>>,
    }

    impl FixedProvider {
        fn new(body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                body: body.into(),
                last_messages: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LLMProvider for FixedProvider {
        async fn chat(
            &self,
            messages: Vec<ChatMessage>,
            model: &str,
        ) -> Result<ChatResponse, LLMError> {
            *self.last_messages.lock().unwrap() = messages;
            Ok(ChatResponse {
                content: self.body.clone(),
                model: model.to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn manager_with(provider: Arc<FixedProvider>) -> Arc<LLMProviderManager> {
        let config = LLMConfig {
            provider: "fixed".to_string(),
            model: "fixed-1".to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_base_url: None,
            request_timeout_secs: 5,
        };
        let manager = LLMProviderManager::new(&config);
        manager.register_provider("fixed", provider);
        Arc::new(manager)
    }

    fn store_with_two_profiles() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        let vocabulary = Vocabulary::builtin();
        store.seed_vocabulary(&vocabulary).unwrap();
        for (name, cluster, summary) in [
            ("Анна", "IT", "SaaS для логистики"),
            ("Борис", "Финансы", "Инвестор"),
        ] {
            let outcome = store
                .upsert_profile(&commugraph_core::NewProfile {
                    name: name.to_string(),
                    cluster: cluster.to_string(),
                    summary: summary.to_string(),
                    goal: String::new(),
                    emoji: None,
                    tags: vec![],
                    telegram_id: Some(format!("tg-{name}")),
                    post_url: None,
                })
                .unwrap();
            store
                .set_profile_tags(outcome.id, &["Логистика".to_string()], &vocabulary)
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_empty_roster_is_an_error() {
        let store = SqliteStore::in_memory().unwrap();
        let provider = FixedProvider::new("{}");
        let assistant = Assistant::new(Arc::new(store), manager_with(provider));

        let err = assistant
            .respond(vec![ChatMessage::user("кто тут инвестор?")])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::EmptyRoster));
    }

    #[tokio::test]
    async fn test_roster_prompt_and_id_filtering() {
        let store = store_with_two_profiles();
        let body = json!({
            "reply": "Борис — инвестор.",
            "related_profile_ids": [2, "1", 99, null]
        })
        .to_string();
        let provider = FixedProvider::new(body);
        let assistant = Assistant::new(store, manager_with(provider.clone()));

        let reply = assistant
            .respond(vec![ChatMessage::user("кто инвестор?")])
            .await
            .unwrap();

        assert_eq!(reply.reply, "Борис — инвестор.");
        // 99 does not exist, null is not an id; string "1" parses.
        assert_eq!(reply.related_profile_ids, vec![2, 1]);

        let sent = provider.last_messages.lock().unwrap().clone();
        assert_eq!(sent[0].role, "system");
        assert!(sent[0].content.contains("Анна"));
        assert!(sent[0].content.contains("Борис"));
        assert!(sent[0].content.contains("ID: 1"));
        assert_eq!(sent.last().unwrap().content, "кто инвестор?");
    }

    #[tokio::test]
    async fn test_history_window_keeps_newest_messages() {
        let store = store_with_two_profiles();
        let provider = FixedProvider::new(r#"{"reply": "ok", "related_profile_ids": []}"#);
        let assistant = Assistant::new(store, manager_with(provider.clone()));

        let messages: Vec<ChatMessage> = (0..30)
            .map(|i| ChatMessage::user(format!("msg {i}")))
            .collect();
        assistant.respond(messages).await.unwrap();

        let sent = provider.last_messages.lock().unwrap().clone();
        // System prompt plus the trailing window.
        assert_eq!(sent.len(), HISTORY_LIMIT + 1);
        assert_eq!(sent[1].content, "msg 10");
        assert_eq!(sent.last().unwrap().content, "msg 29");
    }

    #[tokio::test]
    async fn test_prose_wrapped_reply_is_parsed() {
        let store = store_with_two_profiles();
        let provider = FixedProvider::new(
            "Sure! {\"reply\": \"Анна делает SaaS.\", \"related_profile_ids\": [\"1\"]} Hope that helps.",
        );
        let assistant = Assistant::new(store, manager_with(provider));

        let reply = assistant
            .respond(vec![ChatMessage::user("кто делает SaaS?")])
            .await
            .unwrap();
        assert_eq!(reply.related_profile_ids, vec![1]);
    }

    #[tokio::test]
    async fn test_response_without_json_is_malformed() {
        let store = store_with_two_profiles();
        let provider = FixedProvider::new("Я не могу ответить.");
        let assistant = Assistant::new(store, manager_with(provider));

        let err = assistant
            .respond(vec![ChatMessage::user("вопрос")])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Malformed(_)));
    }
}
