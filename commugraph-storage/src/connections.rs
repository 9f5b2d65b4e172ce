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

//! Recorded connections.
//!
//! Edges are upsert-only: recomputation refreshes strength and kind in
//! place and never deletes rows. The (source_id, target_id) key is
//! canonical with source < target, enforced both here and by a CHECK
//! constraint.

use chrono::Utc;
use commugraph_core::{Connection, ConnectionKind, ProfileId};
use rusqlite::{params, Row};

use crate::{SqliteStore, StoreError};

impl SqliteStore {
    pub fn upsert_connection(&self, connection: &Connection) -> Result<(), StoreError> {
        self.upsert_connections(std::slice::from_ref(connection))
    }

    /// Upsert a batch of edges in one transaction.
    pub fn upsert_connections(&self, connections: &[Connection]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO connections (source_id, target_id, strength, kind, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(source_id, target_id) DO UPDATE SET
                   strength = excluded.strength,
                   kind = excluded.kind,
                   updated_at = excluded.updated_at",
            )?;
            let now = Utc::now().to_rfc3339();
            for edge in connections {
                stmt.execute(params![
                    edge.source,
                    edge.target,
                    edge.strength,
                    edge.kind.as_str(),
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_connections(&self) -> Result<Vec<Connection>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, strength, kind FROM connections
             ORDER BY source_id, target_id",
        )?;
        let rows = stmt.query_map([], Self::map_connection_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Edges touching one profile.
    pub fn connections_for(&self, id: ProfileId) -> Result<Vec<Connection>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, strength, kind FROM connections
             WHERE source_id = ?1 OR target_id = ?1
             ORDER BY source_id, target_id",
        )?;
        let rows = stmt.query_map(params![id], Self::map_connection_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    fn map_connection_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
        let kind: String = row.get(3)?;
        Ok(Connection {
            source: row.get(0)?,
            target: row.get(1)?,
            strength: row.get(2)?,
            kind: ConnectionKind::from_str(&kind),
        })
    }
}
