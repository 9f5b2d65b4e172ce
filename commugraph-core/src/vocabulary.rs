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

//! Tag Vocabulary
//!
//! The controlled set of tags a profile may carry, grouped into categories,
//! plus pairwise affinities between tags and the cluster label set. The
//! vocabulary is loaded once (from storage or the builtin seed) and shared
//! read-only with the scoring engine and the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category key reserved for cluster labels.
pub const CLUSTER_CATEGORY: &str = "cluster";

/// Category key whose shared tags mark an industry match.
pub const INDUSTRY_CATEGORY: &str = "industry";

/// A tag category (e.g. "industry", "skills").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    /// Stable key used in lookups and storage
    pub key: String,
    /// Human-readable name
    pub name: String,
}

impl TagCategory {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// A controlled-vocabulary tag. Names are unique across categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Key of the category this tag belongs to
    pub category: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Kind of a recorded tag-pair affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffinityKind {
    /// Need/offer counterparts (e.g. seeks investment / offers investment)
    Complementary,
    /// Both tags belong to the same category
    CategoryInternal,
    /// Any other recorded relationship
    Generic,
}

impl AffinityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffinityKind::Complementary => "complementary",
            AffinityKind::CategoryInternal => "category-internal",
            AffinityKind::Generic => "generic",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "complementary" => AffinityKind::Complementary,
            "category-internal" => AffinityKind::CategoryInternal,
            _ => AffinityKind::Generic,
        }
    }
}

/// A recorded pairwise affinity between two tags.
///
/// Affinities are symmetric: `(a, b)` and `(b, a)` describe the same
/// relationship and lookups try both orderings. Only pairs with weight > 0
/// are recorded; absence means weight 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAffinity {
    pub tag_a: String,
    pub tag_b: String,
    /// Normalized weight in [0, 1]
    pub weight: f64,
    pub kind: AffinityKind,
}

impl TagAffinity {
    pub fn new(
        tag_a: impl Into<String>,
        tag_b: impl Into<String>,
        weight: f64,
        kind: AffinityKind,
    ) -> Self {
        Self {
            tag_a: tag_a.into(),
            tag_b: tag_b.into(),
            weight: weight.clamp(0.0, 1.0),
            kind,
        }
    }
}

/// A cluster label with optional display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub color: Option<String>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Some(color.into()),
        }
    }
}

/// The full tag vocabulary with lookup indexes.
///
/// Construction collapses duplicate tag names (first category wins) and
/// indexes affinities under an order-normalized pair key so lookups are
/// symmetric without scanning.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    categories: Vec<TagCategory>,
    tags: Vec<Tag>,
    clusters: Vec<Cluster>,
    affinities: Vec<TagAffinity>,
    category_by_tag: HashMap<String, String>,
    affinity_index: HashMap<(String, String), usize>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Vocabulary {
    pub fn new(
        categories: Vec<TagCategory>,
        tags: Vec<Tag>,
        clusters: Vec<Cluster>,
        affinities: Vec<TagAffinity>,
    ) -> Self {
        let mut category_by_tag = HashMap::new();
        let mut deduped = Vec::with_capacity(tags.len());
        for tag in tags {
            if !category_by_tag.contains_key(&tag.name) {
                category_by_tag.insert(tag.name.clone(), tag.category.clone());
                deduped.push(tag);
            }
        }

        let mut affinity_index = HashMap::new();
        let mut kept = Vec::with_capacity(affinities.len());
        for affinity in affinities {
            // Self-pairs carry no information the overlap rule doesn't.
            if affinity.tag_a == affinity.tag_b || affinity.weight <= 0.0 {
                continue;
            }
            let key = pair_key(&affinity.tag_a, &affinity.tag_b);
            if !affinity_index.contains_key(&key) {
                affinity_index.insert(key, kept.len());
                kept.push(affinity);
            }
        }

        Self {
            categories,
            tags: deduped,
            clusters,
            affinities: kept,
            category_by_tag,
            affinity_index,
        }
    }

    pub fn categories(&self) -> &[TagCategory] {
        &self.categories
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn affinities(&self) -> &[TagAffinity] {
        &self.affinities
    }

    /// Whether `name` is a known tag.
    pub fn contains_tag(&self, name: &str) -> bool {
        self.category_by_tag.contains_key(name)
    }

    /// Category key of a tag, if the tag is in the vocabulary.
    pub fn category_of(&self, tag: &str) -> Option<&str> {
        self.category_by_tag.get(tag).map(String::as_str)
    }

    /// Recorded affinity between two tags, in either ordering.
    pub fn affinity_between(&self, a: &str, b: &str) -> Option<&TagAffinity> {
        self.affinity_index
            .get(&pair_key(a, b))
            .map(|&idx| &self.affinities[idx])
    }

    /// Whether the pair is recorded as complementary (either ordering).
    pub fn is_complementary(&self, a: &str, b: &str) -> bool {
        self.affinity_between(a, b)
            .map(|aff| aff.kind == AffinityKind::Complementary)
            .unwrap_or(false)
    }

    /// Cluster label names, in display order.
    pub fn cluster_labels(&self) -> Vec<&str> {
        self.clusters.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains_cluster(&self, name: &str) -> bool {
        self.clusters.iter().any(|c| c.name == name)
    }

    /// Names of all ordinary (non-cluster-category) tags, for the extractor.
    pub fn ordinary_tag_names(&self) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| t.category != CLUSTER_CATEGORY)
            .map(|t| t.name.as_str())
            .collect()
    }

    /// The vocabulary the original community deployment shipped with.
    ///
    /// Tag names and cluster labels are Russian because the member base is;
    /// they are opaque strings to every algorithm here.
    pub fn builtin() -> Self {
        let categories = vec![
            TagCategory::new(INDUSTRY_CATEGORY, "Отрасли и направления"),
            TagCategory::new("skills", "Навыки и экспертиза"),
            TagCategory::new("stage", "Стадия бизнеса"),
            TagCategory::new("needs", "Что ищет"),
            TagCategory::new("offers", "Что может предложить"),
            TagCategory::new("model", "Бизнес-модель"),
        ];

        let mut tags = Vec::new();
        let groups: [(&str, &[&str]); 6] = [
            (
                INDUSTRY_CATEGORY,
                &[
                    "IT/Software",
                    "E-commerce",
                    "EdTech",
                    "FinTech",
                    "HealthTech",
                    "FoodTech",
                    "PropTech",
                    "Marketing",
                    "Консалтинг",
                    "Производство",
                    "Услуги",
                    "Торговля",
                    "HoReCa",
                    "Логистика",
                    "Строительство",
                    "Медиа",
                    "Развлечения",
                    "Спорт/Фитнес",
                    "Красота",
                    "Образование",
                ],
            ),
            (
                "skills",
                &[
                    "Продажи",
                    "Маркетинг",
                    "SMM",
                    "Разработка",
                    "Дизайн",
                    "Управление",
                    "Финансы",
                    "Юридические вопросы",
                    "HR",
                    "PR",
                    "Аналитика",
                    "Стратегия",
                    "Операции",
                    "Продукт",
                    "Data Science",
                ],
            ),
            (
                "stage",
                &[
                    "Идея",
                    "MVP",
                    "Первые клиенты",
                    "Растущий бизнес",
                    "Масштабирование",
                    "Зрелый бизнес",
                    "Экзит",
                ],
            ),
            (
                "needs",
                &[
                    "Инвестиции",
                    "Партнёры",
                    "Клиенты",
                    "Сотрудники",
                    "Менторство",
                    "Экспертиза",
                    "Подрядчики",
                    "Соинвесторы",
                    "Каналы продаж",
                    "Нетворкинг",
                ],
            ),
            (
                "offers",
                &[
                    "Инвестирую",
                    "Продажи B2B",
                    "Связи",
                    "Юридическая помощь",
                ],
            ),
            (
                "model",
                &[
                    "B2B",
                    "B2C",
                    "B2B2C",
                    "Marketplace",
                    "SaaS",
                    "Subscription",
                    "Freemium",
                    "Агентская модель",
                    "Франшиза",
                ],
            ),
        ];
        for (category, names) in groups {
            for name in names {
                tags.push(Tag::new(*name, category));
            }
        }

        let c = AffinityKind::Complementary;
        let i = AffinityKind::CategoryInternal;
        let g = AffinityKind::Generic;
        let affinities = vec![
            // Need/offer counterparts
            TagAffinity::new("Инвестиции", "Инвестирую", 0.9, c),
            TagAffinity::new("Клиенты", "Продажи B2B", 0.9, c),
            TagAffinity::new("Сотрудники", "HR", 0.9, c),
            TagAffinity::new("Подрядчики", "Разработка", 0.9, c),
            TagAffinity::new("Маркетинг", "SMM", 0.9, c),
            TagAffinity::new("Юридические вопросы", "Юридическая помощь", 0.9, c),
            TagAffinity::new("Менторство", "Идея", 0.9, c),
            TagAffinity::new("Экспертиза", "MVP", 0.9, c),
            // Cross-category relationships
            TagAffinity::new("Партнёры", "Нетворкинг", 0.8, g),
            TagAffinity::new("Подрядчики", "Маркетинг", 0.8, g),
            TagAffinity::new("Соинвесторы", "Инвестирую", 0.9, g),
            TagAffinity::new("Каналы продаж", "Продажи B2B", 0.8, g),
            TagAffinity::new("Первые клиенты", "Продажи", 0.8, g),
            TagAffinity::new("Масштабирование", "Инвестиции", 0.9, g),
            TagAffinity::new("E-commerce", "Маркетинг", 0.7, g),
            TagAffinity::new("B2B", "Продажи B2B", 0.9, g),
            TagAffinity::new("Marketplace", "E-commerce", 0.8, g),
            // Related tags within one category
            TagAffinity::new("IT/Software", "EdTech", 0.6, i),
            TagAffinity::new("IT/Software", "FinTech", 0.6, i),
            TagAffinity::new("E-commerce", "Логистика", 0.7, i),
            TagAffinity::new("Финансы", "Аналитика", 0.7, i),
            TagAffinity::new("Управление", "Стратегия", 0.8, i),
            TagAffinity::new("Разработка", "Data Science", 0.6, i),
            TagAffinity::new("SaaS", "Subscription", 0.8, i),
        ];

        let clusters = vec![
            Cluster::new("IT", "#ea580c"),
            Cluster::new("Маркетинг", "#db2777"),
            Cluster::new("Финансы", "#7c3aed"),
            Cluster::new("Производство", "#a16207"),
            Cluster::new("Услуги", "#0891b2"),
            Cluster::new("Консалтинг", "#4f46e5"),
            Cluster::new("E-commerce", "#dc2626"),
            Cluster::new("EdTech", "#ca8a04"),
            Cluster::new("HealthTech", "#059669"),
            Cluster::new("FoodTech", "#65a30d"),
            Cluster::new("PropTech", "#0d9488"),
            Cluster::new("Other", "#6b7280"),
        ];

        Self::new(categories, tags, clusters, affinities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vocabulary() -> Vocabulary {
        Vocabulary::new(
            vec![
                TagCategory::new("industry", "Industry"),
                TagCategory::new("needs", "Needs"),
                TagCategory::new("offers", "Offers"),
            ],
            vec![
                Tag::new("logistics", "industry"),
                Tag::new("fintech", "industry"),
                Tag::new("investment", "needs"),
                Tag::new("investing", "offers"),
            ],
            vec![Cluster::new("IT", "#ea580c")],
            vec![
                TagAffinity::new("investment", "investing", 0.9, AffinityKind::Complementary),
                TagAffinity::new("logistics", "fintech", 0.6, AffinityKind::CategoryInternal),
            ],
        )
    }

    #[test]
    fn test_affinity_lookup_is_symmetric() {
        let vocab = sample_vocabulary();
        let forward = vocab.affinity_between("investment", "investing");
        let reverse = vocab.affinity_between("investing", "investment");
        assert!(forward.is_some());
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_unknown_pair_has_no_affinity() {
        let vocab = sample_vocabulary();
        assert!(vocab.affinity_between("logistics", "investing").is_none());
        assert!(vocab.affinity_between("missing", "investment").is_none());
    }

    #[test]
    fn test_category_lookup() {
        let vocab = sample_vocabulary();
        assert_eq!(vocab.category_of("logistics"), Some("industry"));
        assert_eq!(vocab.category_of("unknown"), None);
    }

    #[test]
    fn test_duplicate_tag_keeps_first_category() {
        let vocab = Vocabulary::new(
            vec![
                TagCategory::new("skills", "Skills"),
                TagCategory::new("offers", "Offers"),
            ],
            vec![Tag::new("marketing", "skills"), Tag::new("marketing", "offers")],
            vec![],
            vec![],
        );
        assert_eq!(vocab.tags().len(), 1);
        assert_eq!(vocab.category_of("marketing"), Some("skills"));
    }

    #[test]
    fn test_self_and_zero_weight_affinities_are_dropped() {
        let vocab = Vocabulary::new(
            vec![],
            vec![],
            vec![],
            vec![
                TagAffinity::new("a", "a", 0.7, AffinityKind::Generic),
                TagAffinity::new("a", "b", 0.0, AffinityKind::Generic),
            ],
        );
        assert!(vocab.affinities().is_empty());
    }

    #[test]
    fn test_builtin_vocabulary_is_consistent() {
        let vocab = Vocabulary::builtin();
        assert!(!vocab.clusters().is_empty());
        assert!(vocab.contains_cluster("IT"));
        assert_eq!(vocab.category_of("Логистика"), Some("industry"));
        assert!(vocab.is_complementary("Инвестирую", "Инвестиции"));
        // Every affinity references known tags.
        for affinity in vocab.affinities() {
            assert!(vocab.contains_tag(&affinity.tag_a), "{}", affinity.tag_a);
            assert!(vocab.contains_tag(&affinity.tag_b), "{}", affinity.tag_b);
        }
        // Cluster tags never leak into the extractor-facing list.
        assert_eq!(vocab.ordinary_tag_names().len(), vocab.tags().len());
    }
}
