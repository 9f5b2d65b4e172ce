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

use crate::api::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use commugraph_core::{AffinityKind, Vocabulary, CLUSTER_CATEGORY};
use serde::Serialize;
use std::collections::BTreeMap;

/// Affinities below this weight are noise for the legend and are not sent.
const AFFINITY_DISPLAY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResponse {
    /// Cluster labels in display order
    pub clusters: Vec<String>,
    /// Display color per cluster, where one is set
    pub cluster_colors: BTreeMap<String, String>,
    /// Tag categories in display order
    pub categories: Vec<CategoryView>,
    /// Tag names per category key, each list in display order
    pub tags_by_category: BTreeMap<String, Vec<String>>,
    /// Every tag usable on a profile
    pub all_tags: Vec<String>,
    /// Strong recorded affinities, strongest first
    pub affinities: Vec<AffinityView>,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityView {
    pub tag_a: String,
    pub tag_b: String,
    pub strength: f64,
    pub kind: AffinityKind,
}

fn vocabulary_response(vocabulary: &Vocabulary) -> VocabularyResponse {
    let clusters: Vec<String> = vocabulary
        .clusters()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    let cluster_colors: BTreeMap<String, String> = vocabulary
        .clusters()
        .iter()
        .filter_map(|c| c.color.clone().map(|color| (c.name.clone(), color)))
        .collect();

    let categories: Vec<CategoryView> = vocabulary
        .categories()
        .iter()
        .filter(|c| c.key != CLUSTER_CATEGORY)
        .map(|c| CategoryView {
            key: c.key.clone(),
            name: c.name.clone(),
        })
        .collect();

    let mut tags_by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for tag in vocabulary.tags() {
        if tag.category == CLUSTER_CATEGORY {
            continue;
        }
        tags_by_category
            .entry(tag.category.clone())
            .or_default()
            .push(tag.name.clone());
    }

    let all_tags: Vec<String> = vocabulary
        .ordinary_tag_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut affinities: Vec<AffinityView> = vocabulary
        .affinities()
        .iter()
        .filter(|a| a.weight >= AFFINITY_DISPLAY_THRESHOLD)
        .map(|a| AffinityView {
            tag_a: a.tag_a.clone(),
            tag_b: a.tag_b.clone(),
            strength: a.weight,
            kind: a.kind,
        })
        .collect();
    affinities.sort_by(|x, y| {
        y.strength
            .total_cmp(&x.strength)
            .then_with(|| x.tag_a.cmp(&y.tag_a))
            .then_with(|| x.tag_b.cmp(&y.tag_b))
    });

    VocabularyResponse {
        clusters,
        cluster_colors,
        categories,
        tags_by_category,
        all_tags,
        affinities,
    }
}

/// GET /api/vocabulary - clusters, categories, tags and strong affinities
pub async fn get_vocabulary(State(state): State<AppState>) -> impl IntoResponse {
    Json(vocabulary_response(state.engine.vocabulary()))
}
