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

//! Commugraph Storage
//!
//! SQLite persistence for the community graph: profiles with their tag
//! assignments, recorded connections, and the tag vocabulary. One
//! connection behind a mutex; callers are expected to be handler-scoped
//! and short-lived, so a single writer is plenty at this scale.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod connections;
mod profiles;
mod vocabulary;

pub use profiles::UpsertOutcome;

/// Storage failures. Callers treat any of these as fatal for the current
/// operation; there is no partial-success reporting at this layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tag_categories (
  key            TEXT PRIMARY KEY,
  name           TEXT NOT NULL,
  display_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tags (
  name           TEXT PRIMARY KEY,
  category       TEXT NOT NULL REFERENCES tag_categories(key),
  display_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tag_affinities (
  tag_a   TEXT NOT NULL,
  tag_b   TEXT NOT NULL,
  weight  REAL NOT NULL,
  kind    TEXT NOT NULL,
  PRIMARY KEY (tag_a, tag_b)
);

CREATE TABLE IF NOT EXISTS clusters (
  name           TEXT PRIMARY KEY,
  color          TEXT,
  display_order  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS profiles (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  name         TEXT NOT NULL,
  cluster      TEXT NOT NULL,
  summary      TEXT NOT NULL DEFAULT '',
  goal         TEXT NOT NULL DEFAULT '',
  emoji        TEXT,
  telegram_id  TEXT UNIQUE,
  post_url     TEXT UNIQUE,
  created_at   TEXT NOT NULL,
  updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_profiles_cluster ON profiles(cluster);

CREATE TABLE IF NOT EXISTS profile_tags (
  profile_id  INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
  tag         TEXT NOT NULL,
  PRIMARY KEY (profile_id, tag)
);
CREATE INDEX IF NOT EXISTS idx_profile_tags_tag ON profile_tags(tag);

CREATE TABLE IF NOT EXISTS connections (
  source_id   INTEGER NOT NULL,
  target_id   INTEGER NOT NULL,
  strength    REAL NOT NULL,
  kind        TEXT NOT NULL,
  updated_at  TEXT NOT NULL,
  PRIMARY KEY (source_id, target_id),
  CHECK (source_id < target_id)
);
"#;

/// SQLite-backed store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        // WAL is silently unavailable for in-memory databases.
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Timestamps are stored as RFC 3339 text; malformed values fall back to
/// "now" rather than failing a whole listing.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use commugraph_core::NewProfile;

    fn sample() -> NewProfile {
        NewProfile {
            name: "Анна".to_string(),
            cluster: "IT".to_string(),
            summary: "Разработка SaaS".to_string(),
            goal: "Ищет партнёров".to_string(),
            emoji: Some("🚀".to_string()),
            tags: vec![],
            telegram_id: Some("tg-1".to_string()),
            post_url: None,
        }
    }

    #[test]
    fn test_open_creates_file_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("commugraph.db");

        let store = SqliteStore::open(&path).unwrap();
        let outcome = store.upsert_profile(&sample()).unwrap();
        drop(store);
        assert!(path.exists());

        let reopened = SqliteStore::open(&path).unwrap();
        let profile = reopened.get_profile(outcome.id).unwrap().unwrap();
        assert_eq!(profile.name, "Анна");
    }

    #[test]
    fn test_in_memory_store_works() {
        let store = SqliteStore::in_memory().unwrap();
        let outcome = store.upsert_profile(&sample()).unwrap();
        assert!(outcome.created);
    }

    #[test]
    fn test_parse_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&now.to_rfc3339());
        assert_eq!(parsed, now);
    }
}
