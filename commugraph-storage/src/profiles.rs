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

//! Profile rows and their tag assignments.
//!
//! Upserts key on the external identifiers: a profile is the same person
//! when the Telegram id matches, or failing that when the source post URL
//! matches. Rows are never deleted here; re-imports refresh them in place.

use chrono::Utc;
use commugraph_core::{NewProfile, Profile, ProfileFilter, ProfileId, Vocabulary};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use tracing::warn;

use crate::{parse_timestamp, SqliteStore, StoreError};

const PROFILE_COLUMNS: &str =
    "id, name, cluster, summary, goal, emoji, telegram_id, post_url, created_at, updated_at";

/// Result of a profile upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: ProfileId,
    pub created: bool,
}

impl SqliteStore {
    /// Look up a profile id by Telegram id first, then by post URL.
    pub fn find_by_external_key(
        &self,
        telegram_id: Option<&str>,
        post_url: Option<&str>,
    ) -> Result<Option<ProfileId>, StoreError> {
        let conn = self.conn.lock();
        Ok(Self::find_existing(&conn, telegram_id, post_url)?)
    }

    /// Insert a profile, or refresh the existing row matched by external
    /// key. Absent external keys in the update keep the stored values.
    pub fn upsert_profile(&self, profile: &NewProfile) -> Result<UpsertOutcome, StoreError> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();

        let existing = Self::find_existing(
            &conn,
            profile.telegram_id.as_deref(),
            profile.post_url.as_deref(),
        )?;
        if let Some(id) = existing {
            conn.execute(
                "UPDATE profiles SET
                   name = ?1, cluster = ?2, summary = ?3, goal = ?4, emoji = ?5,
                   telegram_id = COALESCE(?6, telegram_id),
                   post_url = COALESCE(?7, post_url),
                   updated_at = ?8
                 WHERE id = ?9",
                params![
                    profile.name,
                    profile.cluster,
                    profile.summary,
                    profile.goal,
                    profile.emoji,
                    profile.telegram_id,
                    profile.post_url,
                    now,
                    id
                ],
            )?;
            return Ok(UpsertOutcome { id, created: false });
        }

        conn.execute(
            "INSERT INTO profiles
               (name, cluster, summary, goal, emoji, telegram_id, post_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                profile.name,
                profile.cluster,
                profile.summary,
                profile.goal,
                profile.emoji,
                profile.telegram_id,
                profile.post_url,
                now
            ],
        )?;
        Ok(UpsertOutcome {
            id: conn.last_insert_rowid(),
            created: true,
        })
    }

    /// Replace a profile's tag set. Tags outside the vocabulary are dropped
    /// with a warning; the accepted set is returned.
    pub fn set_profile_tags(
        &self,
        id: ProfileId,
        tags: &[String],
        vocabulary: &Vocabulary,
    ) -> Result<Vec<String>, StoreError> {
        let mut accepted: Vec<String> = Vec::new();
        for tag in tags {
            if !vocabulary.contains_tag(tag) {
                warn!(profile_id = id, tag = %tag, "dropping tag not in vocabulary");
            } else if !accepted.iter().any(|t| t == tag) {
                accepted.push(tag.clone());
            }
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            tx.execute("DELETE FROM profile_tags WHERE profile_id = ?1", params![id])?;
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO profile_tags (profile_id, tag) VALUES (?1, ?2)")?;
            for tag in &accepted {
                stmt.execute(params![id, tag])?;
            }
        }
        tx.commit()?;
        Ok(accepted)
    }

    pub fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                Self::map_profile_row,
            )
            .optional()?;
        let Some(mut profile) = row else {
            return Ok(None);
        };
        profile.tags = Self::tags_for(&conn, id)?;
        Ok(Some(profile))
    }

    /// All profiles passing the filter, ordered by name, tags attached.
    ///
    /// The cluster filter runs in SQL; the search filter runs in Rust
    /// because SQLite's LOWER() only folds ASCII and names here are mostly
    /// Cyrillic.
    pub fn list_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        let conn = self.conn.lock();
        let mut profiles: Vec<Profile> = match &filter.cluster {
            Some(cluster) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE cluster = ?1 ORDER BY name, id"
                ))?;
                let rows = stmt.query_map(params![cluster], Self::map_profile_row)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY name, id"
                ))?;
                let rows = stmt.query_map([], Self::map_profile_row)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        let mut tags_by_profile: HashMap<ProfileId, Vec<String>> = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT profile_id, tag FROM profile_tags ORDER BY profile_id, tag")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, ProfileId>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (profile_id, tag) = row?;
                tags_by_profile.entry(profile_id).or_default().push(tag);
            }
        }
        for profile in &mut profiles {
            if let Some(tags) = tags_by_profile.remove(&profile.id) {
                profile.tags = tags;
            }
        }

        if filter.search.is_some() {
            profiles.retain(|p| filter.matches(p));
        }
        Ok(profiles)
    }

    fn find_existing(
        conn: &Connection,
        telegram_id: Option<&str>,
        post_url: Option<&str>,
    ) -> rusqlite::Result<Option<ProfileId>> {
        if let Some(telegram_id) = telegram_id {
            let id = conn
                .query_row(
                    "SELECT id FROM profiles WHERE telegram_id = ?1",
                    params![telegram_id],
                    |row| row.get(0),
                )
                .optional()?;
            if id.is_some() {
                return Ok(id);
            }
        }
        if let Some(post_url) = post_url {
            let id = conn
                .query_row(
                    "SELECT id FROM profiles WHERE post_url = ?1",
                    params![post_url],
                    |row| row.get(0),
                )
                .optional()?;
            if id.is_some() {
                return Ok(id);
            }
        }
        Ok(None)
    }

    fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;
        Ok(Profile {
            id: row.get(0)?,
            name: row.get(1)?,
            cluster: row.get(2)?,
            summary: row.get(3)?,
            goal: row.get(4)?,
            emoji: row.get(5)?,
            tags: Vec::new(),
            telegram_id: row.get(6)?,
            post_url: row.get(7)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn tags_for(conn: &Connection, id: ProfileId) -> rusqlite::Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT tag FROM profile_tags WHERE profile_id = ?1 ORDER BY tag")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        rows.collect()
    }
}
