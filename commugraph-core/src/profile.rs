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

//! Profile Types
//!
//! A profile is one community member: a name, a cluster label, free-text
//! summary and goal, and an unordered set of vocabulary tags. Profiles are
//! deduplicated by external identity: the author's messaging id or the link
//! to the post they were extracted from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned profile identifier.
pub type ProfileId = i64;

/// A persisted community member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    /// Cluster label, one of the vocabulary's cluster set
    pub cluster: String,
    /// Short description of expertise and background
    pub summary: String,
    /// What this member wants to achieve or find
    pub goal: String,
    pub emoji: Option<String>,
    /// Vocabulary tags; unordered, duplicates collapsed
    pub tags: Vec<String>,
    pub telegram_id: Option<String>,
    pub post_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile content for insert/update; identity fields are the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub cluster: String,
    pub summary: String,
    pub goal: String,
    pub emoji: Option<String>,
    pub tags: Vec<String>,
    pub telegram_id: Option<String>,
    pub post_url: Option<String>,
}

impl NewProfile {
    /// Whether either external identity key is present.
    pub fn has_external_key(&self) -> bool {
        self.telegram_id.is_some() || self.post_url.is_some()
    }
}

/// One raw record submitted to the import surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    /// External author id on the source platform
    #[serde(default)]
    pub author_id: Option<String>,
    /// Link to the source post
    #[serde(default)]
    pub message_link: Option<String>,
    /// Display name from the source platform, used as a fallback
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
}

impl RawPost {
    /// Whether either external identity key is present.
    pub fn has_external_key(&self) -> bool {
        non_empty(&self.author_id).is_some() || non_empty(&self.message_link).is_some()
    }

    pub fn author_id(&self) -> Option<&str> {
        non_empty(&self.author_id)
    }

    pub fn message_link(&self) -> Option<&str> {
        non_empty(&self.message_link)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// One extractor result, tied back to its batch position.
///
/// `record` is the 1-based position within the chunk the extractor was
/// given. The extractor is untrusted: `cluster` and `tags` are validated
/// against the vocabulary before anything is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProfile {
    pub record: usize,
    pub name: String,
    pub cluster: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Filter for profile listing and the graph query surface.
///
/// Absent or empty fields mean "no filtering"; there is no sentinel value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFilter {
    /// Case-insensitive name substring, or an exact tag name
    pub search: Option<String>,
    /// Exact cluster label
    pub cluster: Option<String>,
}

impl ProfileFilter {
    pub fn new(search: Option<String>, cluster: Option<String>) -> Self {
        let normalize = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            search: normalize(search),
            cluster: normalize(cluster),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.cluster.is_none()
    }

    /// Whether a profile passes this filter.
    pub fn matches(&self, profile: &Profile) -> bool {
        if let Some(cluster) = &self.cluster {
            if &profile.cluster != cluster {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let name_hit = profile.name.to_lowercase().contains(&needle);
            let tag_hit = profile.tags.iter().any(|t| t == search);
            if !name_hit && !tag_hit {
                return false;
            }
        }
        true
    }
}
