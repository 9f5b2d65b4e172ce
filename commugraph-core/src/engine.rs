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

//! Connection Engine
//!
//! Owns the vocabulary plus scoring settings and derives the edge set for a
//! collection of profiles. Recomputation is deterministic: the same profiles
//! and config always produce the same edges, so it can run after every
//! import batch or on demand per query.

use crate::connection::Connection;
use crate::profile::{Profile, ProfileId};
use crate::scoring::{self, ScoreBreakdown, ScoringMode};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Whether edges are stored on import or derived per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeMode {
    /// Recompute and upsert edges after each committed import batch
    #[default]
    Persist,
    /// Derive edges from current profiles at query time
    OnDemand,
}

impl EdgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::Persist => "persist",
            EdgeMode::OnDemand => "on-demand",
        }
    }
}

/// Scoring and edge-derivation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub mode: ScoringMode,
    /// Minimum strength for stored edges
    pub persist_threshold: f64,
    /// Minimum strength for on-demand edges
    pub live_threshold: f64,
    /// Maximum edges per profile; 0 disables the cap
    pub degree_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::default(),
            persist_threshold: 0.5,
            live_threshold: 0.3,
            degree_cap: 10,
        }
    }
}

/// Scores profile pairs and derives the capped edge set.
#[derive(Debug, Clone)]
pub struct ConnectionEngine {
    vocabulary: Arc<Vocabulary>,
    config: EngineConfig,
}

impl ConnectionEngine {
    pub fn new(vocabulary: Arc<Vocabulary>, config: EngineConfig) -> Self {
        Self { vocabulary, config }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn threshold(&self, mode: EdgeMode) -> f64 {
        match mode {
            EdgeMode::Persist => self.config.persist_threshold,
            EdgeMode::OnDemand => self.config.live_threshold,
        }
    }

    /// Strength of one pair under the configured scoring mode.
    pub fn score(&self, tags_a: &[String], tags_b: &[String]) -> f64 {
        match self.config.mode {
            ScoringMode::MaxRule => scoring::breakdown(&self.vocabulary, tags_a, tags_b).strength,
            ScoringMode::AverageDegree => {
                scoring::average_degree(&self.vocabulary, tags_a, tags_b)
            }
        }
    }

    /// Per-rule breakdown for one pair.
    ///
    /// In average-degree mode the strength field carries the averaged score
    /// while the rule candidates and kind label stay rule-based.
    pub fn explain(&self, tags_a: &[String], tags_b: &[String]) -> ScoreBreakdown {
        let mut breakdown = scoring::breakdown(&self.vocabulary, tags_a, tags_b);
        if self.config.mode == ScoringMode::AverageDegree {
            breakdown.strength = scoring::average_degree(&self.vocabulary, tags_a, tags_b);
        }
        breakdown
    }

    /// Strength passes the threshold configured for the given mode.
    pub fn connects(&self, score: f64, mode: EdgeMode) -> bool {
        scoring::should_connect(score, self.threshold(mode))
    }

    /// Derive the full edge set for the given profiles.
    ///
    /// Profiles without tags never connect. Candidate edges below the mode
    /// threshold are dropped, then the degree cap keeps an edge only when it
    /// ranks in the top `degree_cap` for both endpoints (by strength, ties
    /// to the lower opposite id). The result is sorted by (source, target).
    pub fn recompute_edges(&self, profiles: &[Profile], mode: EdgeMode) -> Vec<Connection> {
        let threshold = self.threshold(mode);
        let mut candidates = Vec::new();
        for (i, a) in profiles.iter().enumerate() {
            if a.tags.is_empty() {
                continue;
            }
            for b in &profiles[i + 1..] {
                if b.tags.is_empty() || a.id == b.id {
                    continue;
                }
                let breakdown = scoring::breakdown(&self.vocabulary, &a.tags, &b.tags);
                let strength = match self.config.mode {
                    ScoringMode::MaxRule => breakdown.strength,
                    ScoringMode::AverageDegree => {
                        scoring::average_degree(&self.vocabulary, &a.tags, &b.tags)
                    }
                };
                if strength > 0.0 && scoring::should_connect(strength, threshold) {
                    candidates.push(Connection::new(a.id, b.id, strength, breakdown.kind));
                }
            }
        }

        let mut edges = self.apply_degree_cap(candidates);
        edges.sort_by(|x, y| x.source.cmp(&y.source).then(x.target.cmp(&y.target)));
        edges
    }

    /// Keep only edges inside the mutual top-`degree_cap` of both endpoints.
    fn apply_degree_cap(&self, candidates: Vec<Connection>) -> Vec<Connection> {
        let cap = self.config.degree_cap;
        if cap == 0 {
            return candidates;
        }

        let mut incident: HashMap<ProfileId, Vec<usize>> = HashMap::new();
        for (idx, edge) in candidates.iter().enumerate() {
            incident.entry(edge.source).or_default().push(idx);
            incident.entry(edge.target).or_default().push(idx);
        }

        // An edge survives only with both endpoints' approval.
        let mut approvals = vec![0u8; candidates.len()];
        for (profile_id, mut edge_ids) in incident {
            edge_ids.sort_by(|&x, &y| {
                candidates[y]
                    .strength
                    .total_cmp(&candidates[x].strength)
                    .then_with(|| {
                        candidates[x]
                            .other(profile_id)
                            .cmp(&candidates[y].other(profile_id))
                    })
            });
            for &idx in edge_ids.iter().take(cap) {
                approvals[idx] += 1;
            }
        }

        candidates
            .into_iter()
            .zip(approvals)
            .filter(|(_, approvals)| *approvals == 2)
            .map(|(edge, _)| edge)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionKind;
    use crate::vocabulary::{AffinityKind, Tag, TagAffinity, TagCategory};
    use chrono::Utc;

    fn test_vocabulary() -> Vocabulary {
        Vocabulary::new(
            vec![
                TagCategory::new("industry", "Industry"),
                TagCategory::new("skills", "Skills"),
                TagCategory::new("needs", "Needs"),
                TagCategory::new("offers", "Offers"),
            ],
            vec![
                Tag::new("logistics", "industry"),
                Tag::new("ai", "skills"),
                Tag::new("sales", "skills"),
                Tag::new("mentor", "needs"),
                Tag::new("funding", "needs"),
                Tag::new("investing", "offers"),
                Tag::new("audit", "offers"),
            ],
            vec![],
            vec![
                TagAffinity::new("funding", "investing", 0.9, AffinityKind::Complementary),
                TagAffinity::new("mentor", "audit", 0.6, AffinityKind::Generic),
            ],
        )
    }

    fn wide_vocabulary(spokes: usize) -> Vocabulary {
        let mut tags = Vec::new();
        for i in 1..=spokes {
            tags.push(Tag::new(format!("t{i}a"), "skills"));
            tags.push(Tag::new(format!("t{i}b"), "skills"));
        }
        Vocabulary::new(
            vec![TagCategory::new("skills", "Skills")],
            tags,
            vec![],
            vec![],
        )
    }

    fn profile(id: ProfileId, tags: &[&str]) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            name: format!("P{id}"),
            cluster: "IT".to_string(),
            summary: String::new(),
            goal: String::new(),
            emoji: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            telegram_id: None,
            post_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn engine(vocabulary: Vocabulary, config: EngineConfig) -> ConnectionEngine {
        ConnectionEngine::new(Arc::new(vocabulary), config)
    }

    #[test]
    fn test_recompute_connects_above_threshold_only() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        let profiles = vec![
            profile(1, &["ai"]),
            profile(2, &["ai"]),
            profile(3, &["logistics"]),
        ];
        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source, edges[0].target), (1, 2));
        assert_eq!(edges[0].strength, 0.6);
        assert_eq!(edges[0].kind, ConnectionKind::SharedTags);
    }

    #[test]
    fn test_live_threshold_is_looser() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        // Distinct skills tags: category co-membership only, 0.4.
        let profiles = vec![profile(1, &["ai"]), profile(2, &["sales"])];
        assert!(engine.recompute_edges(&profiles, EdgeMode::Persist).is_empty());
        let live = engine.recompute_edges(&profiles, EdgeMode::OnDemand);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].strength, 0.4);
        assert_eq!(live[0].kind, ConnectionKind::Category);
    }

    #[test]
    fn test_edges_canonical_and_sorted() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        let profiles = vec![
            profile(30, &["ai"]),
            profile(10, &["ai"]),
            profile(20, &["ai"]),
        ];
        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        let pairs: Vec<(ProfileId, ProfileId)> =
            edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs, vec![(10, 20), (10, 30), (20, 30)]);
        assert!(edges.iter().all(|e| e.source < e.target));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        let profiles = vec![
            profile(1, &["ai", "funding"]),
            profile(2, &["ai", "investing"]),
            profile(3, &["mentor", "logistics"]),
            profile(4, &["audit"]),
        ];
        let first = engine.recompute_edges(&profiles, EdgeMode::Persist);
        let second = engine.recompute_edges(&profiles, EdgeMode::Persist);
        assert_eq!(first, second);
    }

    #[test]
    fn test_profiles_without_tags_never_connect() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        let profiles = vec![profile(1, &[]), profile(2, &["ai"]), profile(3, &[])];
        assert!(engine
            .recompute_edges(&profiles, EdgeMode::OnDemand)
            .is_empty());
    }

    #[test]
    fn test_degree_cap_keeps_mutual_top_k() {
        let spokes = 15;
        let engine = engine(wide_vocabulary(spokes), EngineConfig::default());

        let mut hub_tags = Vec::new();
        for i in 1..=spokes {
            hub_tags.push(format!("t{i}a"));
            hub_tags.push(format!("t{i}b"));
        }
        let hub_tags: Vec<&str> = hub_tags.iter().map(String::as_str).collect();
        let mut profiles = vec![profile(1, &hub_tags)];

        // Spokes 2..=6 share two tags with the hub (0.7), 7..=16 share one
        // (0.6). Spokes share nothing pairwise, so their only candidate edge
        // above the persist threshold is the hub edge.
        for id in 2..=(spokes as ProfileId + 1) {
            let i = id - 1;
            let a = format!("t{i}a");
            let b = format!("t{i}b");
            if id <= 6 {
                profiles.push(profile(id, &[&a, &b]));
            } else {
                profiles.push(profile(id, &[&a]));
            }
        }

        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        assert_eq!(edges.len(), 10);
        assert!(edges.iter().all(|e| e.source == 1));
        // Five strong spokes, then ties resolved toward the lower id.
        let targets: Vec<ProfileId> = edges.iter().map(|e| e.target).collect();
        assert_eq!(targets, (2..=11).collect::<Vec<ProfileId>>());
    }

    #[test]
    fn test_degree_cap_zero_disables_cap() {
        let spokes = 15;
        let config = EngineConfig {
            degree_cap: 0,
            ..EngineConfig::default()
        };
        let engine = engine(wide_vocabulary(spokes), config);

        let mut hub_tags = Vec::new();
        for i in 1..=spokes {
            hub_tags.push(format!("t{i}a"));
        }
        let hub_tags: Vec<&str> = hub_tags.iter().map(String::as_str).collect();
        let mut profiles = vec![profile(1, &hub_tags)];
        for id in 2..=(spokes as ProfileId + 1) {
            let tag = format!("t{}a", id - 1);
            profiles.push(profile(id, &[&tag]));
        }

        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        assert_eq!(edges.len(), spokes);
    }

    #[test]
    fn test_average_degree_mode_scores_and_edges() {
        let config = EngineConfig {
            mode: ScoringMode::AverageDegree,
            ..EngineConfig::default()
        };
        let engine = engine(test_vocabulary(), config);

        let a = vec!["ai".to_string()];
        assert_eq!(engine.score(&a, &a), 1.0);

        // One matched pair out of two dilutes to exactly the threshold.
        let diluted = vec!["ai".to_string(), "mentor".to_string()];
        assert_eq!(engine.score(&diluted, &a), 0.5);

        let profiles = vec![profile(1, &["ai", "mentor"]), profile(2, &["ai"])];
        let edges = engine.recompute_edges(&profiles, EdgeMode::Persist);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].strength, 0.5);
    }

    #[test]
    fn test_explain_reports_winning_rule() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        let a = vec!["funding".to_string(), "ai".to_string()];
        let b = vec!["investing".to_string(), "sales".to_string()];
        let breakdown = engine.explain(&a, &b);
        assert_eq!(breakdown.kind, ConnectionKind::Complementary);
        assert_eq!(breakdown.strength, 0.9);
    }

    #[test]
    fn test_connects_uses_mode_threshold() {
        let engine = engine(test_vocabulary(), EngineConfig::default());
        assert!(engine.connects(0.4, EdgeMode::OnDemand));
        assert!(!engine.connects(0.4, EdgeMode::Persist));
        assert!(engine.connects(0.5, EdgeMode::Persist));
    }
}
