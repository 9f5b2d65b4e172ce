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

//! Commugraph Core
//!
//! Data model and connection engine for the community graph: the tag
//! vocabulary, profiles, pairwise strength scoring, and edge recomputation.
//! Everything in this crate is pure computation over in-memory values;
//! persistence and I/O live in `commugraph-storage` and `commugraph-server`.

pub mod connection;
pub mod engine;
pub mod profile;
pub mod scoring;
pub mod vocabulary;

pub use connection::{Connection, ConnectionKind};
pub use engine::{ConnectionEngine, EdgeMode, EngineConfig};
pub use profile::{ExtractedProfile, NewProfile, Profile, ProfileFilter, ProfileId, RawPost};
pub use scoring::{ScoreBreakdown, ScoringMode};
pub use vocabulary::{AffinityKind, Cluster, Tag, TagAffinity, TagCategory, Vocabulary, CLUSTER_CATEGORY};
