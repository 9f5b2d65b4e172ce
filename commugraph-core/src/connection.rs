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

//! Connection Edges
//!
//! A connection is a derived, undirected weighted edge between two
//! profiles. Exactly one row exists per unordered pair, canonicalized to
//! `source < target`; the constructor enforces this so mirrored duplicates
//! cannot be represented at all.

use crate::profile::ProfileId;
use serde::{Deserialize, Serialize};

/// The scoring rule that produced an edge's winning strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionKind {
    /// Direct tag overlap
    SharedTags,
    /// Recorded complementary pair across the two tag sets
    Complementary,
    /// Common industry-category tag
    Industry,
    /// Co-membership in some other category
    Category,
    /// Recorded pairwise affinity weights
    Affinity,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::SharedTags => "shared-tags",
            ConnectionKind::Complementary => "complementary",
            ConnectionKind::Industry => "industry",
            ConnectionKind::Category => "category",
            ConnectionKind::Affinity => "affinity",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "shared-tags" => ConnectionKind::SharedTags,
            "complementary" => ConnectionKind::Complementary,
            "industry" => ConnectionKind::Industry,
            "category" => ConnectionKind::Category,
            _ => ConnectionKind::Affinity,
        }
    }
}

/// A weighted edge between two profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: ProfileId,
    pub target: ProfileId,
    /// Strength in [0, 1]
    pub strength: f64,
    pub kind: ConnectionKind,
}

impl Connection {
    /// Build an edge with canonical `source < target` ordering and the
    /// strength clamped into [0, 1]. The two ids must differ.
    pub fn new(a: ProfileId, b: ProfileId, strength: f64, kind: ConnectionKind) -> Self {
        debug_assert!(a != b, "self-edges are not representable");
        let (source, target) = if a < b { (a, b) } else { (b, a) };
        Self {
            source,
            target,
            strength: strength.clamp(0.0, 1.0),
            kind,
        }
    }

    pub fn touches(&self, id: ProfileId) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint that is not `id`. Only meaningful when `touches(id)`.
    pub fn other(&self, id: ProfileId) -> ProfileId {
        if self.source == id {
            self.target
        } else {
            self.source
        }
    }
}
