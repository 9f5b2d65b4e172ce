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

//! Profile Extraction using LLM
//!
//! Turns raw community posts into structured member profiles constrained
//! to the tag vocabulary. Each extracted object carries the 1-based number
//! of the record it describes, so the import pipeline can account for
//! every input even when the model drops or reorders records.
//!
//! The extractor output is untrusted. Parsing is lenient (prose around the
//! JSON array is tolerated, malformed objects are skipped) and cluster/tag
//! validation happens downstream in the import pipeline.

use crate::llm::{ChatMessage, LLMError, LLMProviderManager};
use commugraph_core::{ExtractedProfile, RawPost, Vocabulary};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error("malformed extraction response: {0}")]
    Malformed(String),
}

/// Trait for profile extraction backends
#[async_trait::async_trait]
pub trait ProfileExtractor: Send + Sync {
    /// Extract one profile per post; `record` numbers refer to positions
    /// in `posts`, starting at 1.
    async fn extract(
        &self,
        posts: &[RawPost],
        vocabulary: &Vocabulary,
    ) -> Result<Vec<ExtractedProfile>, ExtractError>;
}

/// Profile extractor backed by the LLM provider manager
pub struct LLMExtractor {
    llm: Arc<LLMProviderManager>,
}

impl LLMExtractor {
    pub fn new(llm: Arc<LLMProviderManager>) -> Self {
        Self { llm }
    }
}

const SYSTEM_PROMPT: &str = "You are a community profile extraction system. \
You turn raw member posts into structured profiles. Output only valid JSON.";

/// Build the extraction prompt: numbered records plus the allowed cluster
/// and tag lists from the vocabulary.
fn build_extraction_prompt(posts: &[RawPost], vocabulary: &Vocabulary) -> String {
    let mut records = String::new();
    for (index, post) in posts.iter().enumerate() {
        let author = post.author.as_deref().unwrap_or("unknown");
        records.push_str(&format!(
            "### Record {} (author: {})\n{}\n\n",
            index + 1,
            author,
            post.text.trim()
        ));
    }

    let clusters = vocabulary.cluster_labels().join(", ");
    let tags = vocabulary.ordinary_tag_names().join(", ");

    format!(
        r#"Extract one member profile from each record below. Posts are community introductions, usually in Russian.

## CLUSTERS (pick EXACTLY one of these)
{clusters}

## TAGS (pick 3-10, use EXACTLY these names)
{tags}

## OUTPUT FIELDS
- record: number of the record being described (integer, starts at 1)
- name: the member's name as written in the post
- cluster: one label from the cluster list
- summary: 1-2 sentences about who they are and what they do
- goal: what they are looking for, one sentence
- emoji: one or two emoji capturing the profile
- tags: 3-10 names from the tag list

## EXAMPLE

Input:
### Record 1 (author: Анна)
Привет! Я Анна, делаю SaaS для логистики, ищу инвестиции и партнёров.

Output:
```json
[
  {{"record": 1, "name": "Анна", "cluster": "IT", "summary": "Основатель SaaS-сервиса для логистики.", "goal": "Ищет инвестиции и партнёров.", "emoji": "🚚", "tags": ["SaaS", "Логистика", "Инвестиции", "Партнёры"]}}
]
```

## RECORDS
{records}
## OUTPUT
Return ONLY a valid JSON array with one object per record, in record order. No markdown code blocks, no explanation, just the raw JSON array:
[...]"#
    )
}

/// Parse profiles from the LLM response, skipping malformed objects.
fn parse_extraction_response(response: &str) -> Result<Vec<ExtractedProfile>, ExtractError> {
    let json_start = response.find('[');
    let json_end = response.rfind(']');

    let json_str = match (json_start, json_end) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => {
            return Err(ExtractError::Malformed(
                "no JSON array found in response".to_string(),
            ))
        }
    };

    let items: Vec<serde_json::Value> = serde_json::from_str(json_str)
        .map_err(|e| ExtractError::Malformed(format!("failed to parse profiles JSON: {e}")))?;

    let mut profiles = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<ExtractedProfile>(item) {
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!(error = %e, "Skipping malformed profile object in LLM response"),
        }
    }
    Ok(profiles)
}

#[async_trait::async_trait]
impl ProfileExtractor for LLMExtractor {
    async fn extract(
        &self,
        posts: &[RawPost],
        vocabulary: &Vocabulary,
    ) -> Result<Vec<ExtractedProfile>, ExtractError> {
        let prompt = build_extraction_prompt(posts, vocabulary);
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let response = self.llm.chat(messages).await?;
        let profiles = parse_extraction_response(&response.content)?;

        debug!(
            posts = posts.len(),
            profiles = profiles.len(),
            "Extracted profiles from LLM response"
        );
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author: &str, text: &str) -> RawPost {
        RawPost {
            author_id: None,
            message_link: None,
            author: Some(author.to_string()),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_records_and_vocabulary() {
        let vocabulary = Vocabulary::builtin();
        let posts = vec![post("Анна", "Я Анна, логистика"), post("Борис", "Я Борис, финтех")];

        let prompt = build_extraction_prompt(&posts, &vocabulary);
        assert!(prompt.contains("### Record 1 (author: Анна)"));
        assert!(prompt.contains("### Record 2 (author: Борис)"));
        assert!(prompt.contains("Я Борис, финтех"));
        // Vocabulary is injected, not hardcoded.
        assert!(prompt.contains("Логистика"));
        assert!(prompt.contains("HealthTech"));
    }

    #[test]
    fn test_parse_response_strips_surrounding_prose() {
        let response = r#"Here are the profiles:
[{"record": 1, "name": "Анна", "cluster": "IT", "summary": "s", "goal": "g", "emoji": "🚚", "tags": ["SaaS"]}]
Let me know if you need anything else."#;

        let profiles = parse_extraction_response(response).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].record, 1);
        assert_eq!(profiles[0].name, "Анна");
        assert_eq!(profiles[0].tags, vec!["SaaS".to_string()]);
    }

    #[test]
    fn test_parse_response_without_array_is_an_error() {
        let err = parse_extraction_response("I could not find any profiles.").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_parse_response_skips_malformed_objects() {
        let response = r#"[
            {"record": 1, "name": "Анна", "cluster": "IT"},
            {"cluster": "IT", "comment": "missing record and name"},
            {"record": 3, "name": "Вера", "cluster": "Финансы", "tags": ["Финансы"]}
        ]"#;

        let profiles = parse_extraction_response(response).unwrap();
        assert_eq!(profiles.len(), 2);
        // Lenient fields default when absent.
        assert_eq!(profiles[0].summary, "");
        assert_eq!(profiles[0].tags, Vec::<String>::new());
        assert_eq!(profiles[1].record, 3);
    }
}
