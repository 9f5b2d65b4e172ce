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

//! Persisted tag vocabulary.
//!
//! Seeding is idempotent (INSERT OR IGNORE), so startup can seed the
//! builtin vocabulary unconditionally without clobbering edits made
//! directly in the database. Display order preserves the seed ordering
//! for the configuration endpoint.

use commugraph_core::{AffinityKind, Cluster, Tag, TagAffinity, TagCategory, Vocabulary};
use rusqlite::params;

use crate::{SqliteStore, StoreError};

impl SqliteStore {
    /// No tags have been stored yet.
    pub fn vocabulary_is_empty(&self) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    /// Write every vocabulary entry that is not already present.
    pub fn seed_vocabulary(&self, vocabulary: &Vocabulary) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut categories = tx.prepare(
                "INSERT OR IGNORE INTO tag_categories (key, name, display_order)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (order, category) in vocabulary.categories().iter().enumerate() {
                categories.execute(params![category.key, category.name, order as i64])?;
            }

            let mut tags = tx.prepare(
                "INSERT OR IGNORE INTO tags (name, category, display_order)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (order, tag) in vocabulary.tags().iter().enumerate() {
                tags.execute(params![tag.name, tag.category, order as i64])?;
            }

            let mut clusters = tx.prepare(
                "INSERT OR IGNORE INTO clusters (name, color, display_order)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (order, cluster) in vocabulary.clusters().iter().enumerate() {
                clusters.execute(params![cluster.name, cluster.color, order as i64])?;
            }

            let mut affinities = tx.prepare(
                "INSERT OR IGNORE INTO tag_affinities (tag_a, tag_b, weight, kind)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for affinity in vocabulary.affinities() {
                // Canonical lexicographic pair order in the table.
                let (a, b) = if affinity.tag_a <= affinity.tag_b {
                    (&affinity.tag_a, &affinity.tag_b)
                } else {
                    (&affinity.tag_b, &affinity.tag_a)
                };
                affinities.execute(params![a, b, affinity.weight, affinity.kind.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary, StoreError> {
        let conn = self.conn.lock();

        let categories: Vec<TagCategory> = {
            let mut stmt =
                conn.prepare("SELECT key, name FROM tag_categories ORDER BY display_order, key")?;
            let rows = stmt.query_map([], |row| {
                Ok(TagCategory {
                    key: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let tags: Vec<Tag> = {
            let mut stmt =
                conn.prepare("SELECT name, category FROM tags ORDER BY display_order, name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Tag {
                    name: row.get(0)?,
                    category: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let clusters: Vec<Cluster> = {
            let mut stmt =
                conn.prepare("SELECT name, color FROM clusters ORDER BY display_order, name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Cluster {
                    name: row.get(0)?,
                    color: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let affinities: Vec<TagAffinity> = {
            let mut stmt = conn.prepare(
                "SELECT tag_a, tag_b, weight, kind FROM tag_affinities ORDER BY tag_a, tag_b",
            )?;
            let rows = stmt.query_map([], |row| {
                let kind: String = row.get(3)?;
                Ok(TagAffinity {
                    tag_a: row.get(0)?,
                    tag_b: row.get(1)?,
                    weight: row.get(2)?,
                    kind: AffinityKind::from_str(&kind),
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        Ok(Vocabulary::new(categories, tags, clusters, affinities))
    }
}
