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

//! Pairwise Strength Scoring
//!
//! Turns two unordered tag sets into a single strength in [0, 1]. The
//! default mode applies four rules and takes the maximum candidate: one
//! strong signal dominates even when most tags are unrelated. The alternate
//! mode averages match weights over every cross pair of tags.
//!
//! Scoring is symmetric, total, and never fails: empty sets score 0 and
//! tags without vocabulary data simply contribute nothing.

use crate::connection::ConnectionKind;
use crate::vocabulary::{AffinityKind, Vocabulary, CLUSTER_CATEGORY, INDUSTRY_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Which scoring strategy the engine applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    /// Maximum over the rule candidates (overlap, complementary pair,
    /// category co-membership, affinity mean)
    #[default]
    MaxRule,
    /// Mean match weight over all cross pairs of tags
    AverageDegree,
}

/// Per-rule candidates for one pair, plus the winning rule and strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Tags present in both sets, sorted
    pub shared_tags: Vec<String>,
    /// Candidate from direct overlap
    pub shared: f64,
    /// Candidate from a recorded complementary pair
    pub complementary: f64,
    /// Candidate from a common industry-category tag
    pub industry: f64,
    /// Candidate from co-membership in some other category
    pub category: f64,
    /// Candidate from the mean of recorded cross-pair affinities
    pub affinity: f64,
    /// Winning candidate, clamped to [0, 1]
    pub strength: f64,
    /// Rule that produced the winning candidate
    pub kind: ConnectionKind,
}

impl ScoreBreakdown {
    fn empty() -> Self {
        Self {
            shared_tags: Vec::new(),
            shared: 0.0,
            complementary: 0.0,
            industry: 0.0,
            category: 0.0,
            affinity: 0.0,
            strength: 0.0,
            kind: ConnectionKind::SharedTags,
        }
    }
}

/// Strength passes the connect threshold.
pub fn should_connect(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Compute the per-rule candidates for two tag sets (max-rule semantics).
pub fn breakdown(vocabulary: &Vocabulary, tags_a: &[String], tags_b: &[String]) -> ScoreBreakdown {
    let set_a: BTreeSet<&str> = tags_a.iter().map(String::as_str).collect();
    let set_b: BTreeSet<&str> = tags_b.iter().map(String::as_str).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return ScoreBreakdown::empty();
    }

    let shared_tags: Vec<String> = set_a
        .intersection(&set_b)
        .map(|t| t.to_string())
        .collect();
    let shared = if shared_tags.is_empty() {
        0.0
    } else {
        (0.5 + 0.1 * shared_tags.len() as f64).min(1.0)
    };

    let mut complementary = 0.0;
    for a in &set_a {
        for b in &set_b {
            if vocabulary.is_complementary(a, b) {
                complementary = 0.9;
            }
        }
    }

    let categories_a = partition_by_category(vocabulary, &set_a);
    let categories_b = partition_by_category(vocabulary, &set_b);
    let mut industry = 0.0;
    let mut category = 0.0;
    for (key, in_a) in &categories_a {
        let Some(in_b) = categories_b.get(key) else {
            continue;
        };
        if *key == INDUSTRY_CATEGORY {
            // Industry needs a shared tag, not mere co-membership.
            if in_a.iter().any(|t| in_b.contains(t)) {
                industry = 0.8;
            }
        } else if *key != CLUSTER_CATEGORY {
            category = 0.4;
        }
    }

    let mut affinity_sum = 0.0;
    let mut affinity_count = 0usize;
    for a in &set_a {
        for b in &set_b {
            if let Some(aff) = vocabulary.affinity_between(a, b) {
                // Complementary pairs are priced by their own rule.
                if aff.kind != AffinityKind::Complementary {
                    affinity_sum += aff.weight;
                    affinity_count += 1;
                }
            }
        }
    }
    let affinity = if affinity_count > 0 {
        affinity_sum / affinity_count as f64
    } else {
        0.0
    };

    // First rule wins ties, in declaration order.
    let candidates = [
        (shared, ConnectionKind::SharedTags),
        (complementary, ConnectionKind::Complementary),
        (industry, ConnectionKind::Industry),
        (category, ConnectionKind::Category),
        (affinity, ConnectionKind::Affinity),
    ];
    let mut strength = 0.0;
    let mut kind = ConnectionKind::SharedTags;
    for (candidate, candidate_kind) in candidates {
        if candidate > strength {
            strength = candidate;
            kind = candidate_kind;
        }
    }

    ScoreBreakdown {
        shared_tags,
        shared,
        complementary,
        industry,
        category,
        affinity,
        strength: strength.clamp(0.0, 1.0),
        kind,
    }
}

/// Alternate mode: mean match weight over every cross pair.
///
/// A same-tag pair weighs 1.0; otherwise the recorded affinity weight (any
/// kind) applies, or 0.0 when none is recorded. The divisor is the full
/// cross-pair count, so unrelated tags dilute the score.
pub fn average_degree(vocabulary: &Vocabulary, tags_a: &[String], tags_b: &[String]) -> f64 {
    let set_a: BTreeSet<&str> = tags_a.iter().map(String::as_str).collect();
    let set_b: BTreeSet<&str> = tags_b.iter().map(String::as_str).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let mut sum = 0.0;
    for a in &set_a {
        for b in &set_b {
            if a == b {
                sum += 1.0;
            } else if let Some(aff) = vocabulary.affinity_between(a, b) {
                sum += aff.weight;
            }
        }
    }
    sum / (set_a.len() * set_b.len()) as f64
}

fn partition_by_category<'a>(
    vocabulary: &'a Vocabulary,
    tags: &BTreeSet<&'a str>,
) -> HashMap<&'a str, HashSet<&'a str>> {
    let mut by_category: HashMap<&str, HashSet<&str>> = HashMap::new();
    for tag in tags {
        if let Some(category) = vocabulary.category_of(tag) {
            by_category.entry(category).or_default().insert(tag);
        }
    }
    by_category
}
