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

//! Graph Read Side
//!
//! Assembles the participant/connection view served to clients. Edges come
//! from the store (persist backing) or from a fresh recomputation over all
//! profiles (on-demand backing); either way only edges whose both endpoints
//! survive the filter are returned, so a filtered view never shows an edge
//! into a hidden node.

use commugraph_core::{
    Connection, ConnectionEngine, ConnectionKind, EdgeMode, Profile, ProfileFilter, ProfileId,
};
use commugraph_storage::{SqliteStore, StoreError};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub id: ProfileId,
    pub name: String,
    pub cluster: String,
    pub summary: String,
    pub goal: String,
    pub emoji: Option<String>,
    pub tags: Vec<String>,
}

impl From<Profile> for ParticipantView {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            cluster: profile.cluster,
            summary: profile.summary,
            goal: profile.goal,
            emoji: profile.emoji,
            tags: profile.tags,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub source: ProfileId,
    pub target: ProfileId,
    pub kind: ConnectionKind,
    /// Strength rounded to two decimals for the wire
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub participants: Vec<ParticipantView>,
    pub connections: Vec<ConnectionView>,
    pub total: usize,
}

pub struct GraphService {
    store: Arc<SqliteStore>,
    engine: Arc<ConnectionEngine>,
    backing: EdgeMode,
}

impl GraphService {
    pub fn new(store: Arc<SqliteStore>, engine: Arc<ConnectionEngine>, backing: EdgeMode) -> Self {
        Self {
            store,
            engine,
            backing,
        }
    }

    /// Build the graph view for a filter.
    pub fn get_graph(&self, filter: &ProfileFilter) -> Result<GraphView, StoreError> {
        let visible = self.store.list_profiles(filter)?;

        let edges: Vec<Connection> = match self.backing {
            EdgeMode::Persist => self.store.list_connections()?,
            EdgeMode::OnDemand => {
                // Scores depend only on endpoint tags, so recomputing over
                // the visible subset would be enough; the degree cap does
                // not, it needs every profile's competition.
                let all = if filter.is_empty() {
                    visible.clone()
                } else {
                    self.store.list_profiles(&ProfileFilter::default())?
                };
                self.engine.recompute_edges(&all, EdgeMode::OnDemand)
            }
        };

        let visible_ids: HashSet<ProfileId> = visible.iter().map(|p| p.id).collect();
        let connections: Vec<ConnectionView> = edges
            .into_iter()
            .filter(|e| visible_ids.contains(&e.source) && visible_ids.contains(&e.target))
            .map(|e| ConnectionView {
                source: e.source,
                target: e.target,
                kind: e.kind,
                strength: round2(e.strength),
            })
            .collect();

        let participants: Vec<ParticipantView> =
            visible.into_iter().map(ParticipantView::from).collect();
        let total = participants.len();

        Ok(GraphView {
            participants,
            connections,
            total,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use commugraph_core::{
        AffinityKind, Cluster, EngineConfig, NewProfile, ScoringMode, Tag, TagAffinity,
        TagCategory, Vocabulary,
    };

    fn test_vocabulary() -> Vocabulary {
        Vocabulary::new(
            vec![
                TagCategory::new("needs", "Needs"),
                TagCategory::new("offers", "Offers"),
            ],
            vec![
                Tag::new("funding", "needs"),
                Tag::new("partners", "needs"),
                Tag::new("scaling", "needs"),
                Tag::new("investing", "offers"),
                Tag::new("networking", "offers"),
                Tag::new("audit", "offers"),
            ],
            vec![Cluster::new("IT", "#ea580c"), Cluster::new("Finance", "#7c3aed")],
            vec![
                TagAffinity::new("funding", "investing", 0.9, AffinityKind::Generic),
                TagAffinity::new("partners", "networking", 0.8, AffinityKind::Generic),
                TagAffinity::new("scaling", "audit", 0.8, AffinityKind::Generic),
            ],
        )
    }

    fn engine(backing_threshold: f64) -> Arc<ConnectionEngine> {
        Arc::new(ConnectionEngine::new(
            Arc::new(test_vocabulary()),
            EngineConfig {
                mode: ScoringMode::MaxRule,
                persist_threshold: backing_threshold,
                live_threshold: backing_threshold,
                degree_cap: 10,
            },
        ))
    }

    fn add_profile(store: &SqliteStore, name: &str, cluster: &str, tags: &[&str]) -> ProfileId {
        let vocabulary = test_vocabulary();
        let outcome = store
            .upsert_profile(&NewProfile {
                name: name.to_string(),
                cluster: cluster.to_string(),
                summary: String::new(),
                goal: String::new(),
                emoji: None,
                tags: vec![],
                telegram_id: Some(format!("tg-{name}")),
                post_url: None,
            })
            .unwrap();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        store.set_profile_tags(outcome.id, &tags, &vocabulary).unwrap();
        outcome.id
    }

    fn seeded_store() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        store.seed_vocabulary(&test_vocabulary()).unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_on_demand_graph_recomputes_edges() {
        let store = seeded_store();
        let a = add_profile(&store, "Анна", "IT", &["funding"]);
        let b = add_profile(&store, "Борис", "Finance", &["investing"]);

        let service = GraphService::new(store.clone(), engine(0.5), EdgeMode::OnDemand);
        let view = service.get_graph(&ProfileFilter::default()).unwrap();

        assert_eq!(view.total, 2);
        assert_eq!(view.connections.len(), 1);
        assert_eq!(view.connections[0].source, a.min(b));
        assert_eq!(view.connections[0].target, a.max(b));
        // Nothing was written to the store.
        assert!(store.list_connections().unwrap().is_empty());
    }

    #[test]
    fn test_persist_graph_reads_stored_edges() {
        let store = seeded_store();
        let a = add_profile(&store, "Анна", "IT", &["funding"]);
        let b = add_profile(&store, "Борис", "Finance", &["investing"]);

        let engine = engine(0.5);
        let profiles = store.list_profiles(&ProfileFilter::default()).unwrap();
        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        store.upsert_connections(&edges).unwrap();

        let service = GraphService::new(store, engine, EdgeMode::Persist);
        let view = service.get_graph(&ProfileFilter::default()).unwrap();

        assert_eq!(view.connections.len(), 1);
        assert_eq!(view.connections[0].source, a.min(b));
        assert_eq!(view.connections[0].target, a.max(b));
        assert_eq!(view.connections[0].strength, 0.9);
    }

    #[test]
    fn test_filtered_view_hides_edges_to_hidden_nodes() {
        let store = seeded_store();
        add_profile(&store, "Анна", "IT", &["funding"]);
        add_profile(&store, "Борис", "Finance", &["investing"]);

        let service = GraphService::new(store, engine(0.5), EdgeMode::OnDemand);
        let filter = ProfileFilter::new(None, Some("IT".to_string()));
        let view = service.get_graph(&filter).unwrap();

        assert_eq!(view.total, 1);
        assert_eq!(view.participants[0].name, "Анна");
        // The only edge leads out of the filtered set.
        assert!(view.connections.is_empty());
    }

    #[test]
    fn test_strength_rounded_to_two_decimals() {
        let store = seeded_store();
        // Three recorded cross pairs, no complementary kinds: the affinity
        // rule averages (0.9 + 0.8 + 0.8) / 3.
        add_profile(&store, "Анна", "IT", &["funding", "partners", "scaling"]);
        add_profile(&store, "Борис", "Finance", &["investing", "networking", "audit"]);

        let service = GraphService::new(store, engine(0.3), EdgeMode::OnDemand);
        let view = service.get_graph(&ProfileFilter::default()).unwrap();

        assert_eq!(view.connections.len(), 1);
        assert_eq!(view.connections[0].strength, 0.83);
    }

    #[test]
    fn test_search_filter_limits_participants() {
        let store = seeded_store();
        add_profile(&store, "Анна Иванова", "IT", &["funding"]);
        add_profile(&store, "Борис Петров", "IT", &["investing"]);

        let service = GraphService::new(store, engine(0.5), EdgeMode::OnDemand);
        let filter = ProfileFilter::new(Some("анна".to_string()), None);
        let view = service.get_graph(&filter).unwrap();

        assert_eq!(view.total, 1);
        assert_eq!(view.participants[0].name, "Анна Иванова");
    }
}
