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

//! Import Pipeline
//!
//! Takes a batch of raw posts through dedup, LLM extraction, validation
//! and persistence, then recomputes the stored edge set. Extraction runs
//! in chunks so one failing LLM call only loses that chunk; every input
//! record ends up counted in exactly one report bucket (imported, updated,
//! skipped, or error).
//!
//! Store failures abort the import. Everything committed before the
//! failure stays committed; there is no batch-level transaction.

use crate::extract::ProfileExtractor;
use commugraph_core::{
    ConnectionEngine, EdgeMode, ExtractedProfile, NewProfile, ProfileFilter, RawPost, Vocabulary,
};
use commugraph_storage::{SqliteStore, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-profile cap on accepted tags; extras beyond this are dropped.
const MAX_TAGS_PER_PROFILE: usize = 15;

/// Outcome of one import batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Newly created profiles
    pub imported: usize,
    /// Existing profiles refreshed in place
    pub updated: usize,
    /// Records whose post link was already imported
    pub skipped: usize,
    /// Human-readable per-record failures
    pub errors: Vec<String>,
    /// Written profiles per cluster label
    pub clusters: BTreeMap<String, usize>,
    /// Records in the request
    pub total: usize,
}

pub struct Importer {
    store: Arc<SqliteStore>,
    engine: Arc<ConnectionEngine>,
    extractor: Arc<dyn ProfileExtractor>,
    chunk_size: usize,
    edge_backing: EdgeMode,
}

impl Importer {
    pub fn new(
        store: Arc<SqliteStore>,
        engine: Arc<ConnectionEngine>,
        extractor: Arc<dyn ProfileExtractor>,
        chunk_size: usize,
        edge_backing: EdgeMode,
    ) -> Self {
        Self {
            store,
            engine,
            extractor,
            chunk_size: chunk_size.max(1),
            edge_backing,
        }
    }

    /// Run one import batch.
    pub async fn run(&self, records: Vec<RawPost>) -> Result<ImportReport, StoreError> {
        let vocabulary = self.engine.vocabulary();
        let mut report = ImportReport {
            total: records.len(),
            ..Default::default()
        };

        // Dedup and sanity checks before any LLM call.
        let mut pending: Vec<RawPost> = Vec::new();
        for record in records {
            let label = record_label(&record);
            if record.text.trim().is_empty() {
                report.errors.push(format!("{label}: empty post text"));
                continue;
            }
            if !record.has_external_key() {
                report
                    .errors
                    .push(format!("{label}: missing both authorId and messageLink"));
                continue;
            }
            if let Some(url) = record.message_link() {
                if self.store.find_by_external_key(None, Some(url))?.is_some() {
                    report.skipped += 1;
                    continue;
                }
            }
            pending.push(record);
        }

        for chunk in pending.chunks(self.chunk_size) {
            match self.extractor.extract(chunk, vocabulary).await {
                Ok(extracted) => self.commit_chunk(chunk, extracted, vocabulary, &mut report)?,
                Err(e) => {
                    warn!(error = %e, records = chunk.len(), "Extraction failed for chunk");
                    for record in chunk {
                        report
                            .errors
                            .push(format!("{}: extraction failed: {e}", record_label(record)));
                    }
                }
            }
        }

        if (report.imported > 0 || report.updated > 0) && self.edge_backing == EdgeMode::Persist {
            let profiles = self.store.list_profiles(&ProfileFilter::default())?;
            let edges = self.engine.recompute_edges(&profiles, EdgeMode::Persist);
            self.store.upsert_connections(&edges)?;
            info!(
                profiles = profiles.len(),
                edges = edges.len(),
                "Recomputed connections after import"
            );
        }

        info!(
            total = report.total,
            imported = report.imported,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Import batch finished"
        );
        Ok(report)
    }

    /// Validate extracted profiles against their chunk and persist them.
    fn commit_chunk(
        &self,
        chunk: &[RawPost],
        extracted: Vec<ExtractedProfile>,
        vocabulary: &Vocabulary,
        report: &mut ImportReport,
    ) -> Result<(), StoreError> {
        // First result per record number wins; numbers outside the chunk
        // cannot be attributed to an input and are dropped.
        let mut by_record: HashMap<usize, ExtractedProfile> = HashMap::new();
        for item in extracted {
            if item.record == 0 || item.record > chunk.len() {
                warn!(record = item.record, "Extractor referenced an unknown record number");
                continue;
            }
            by_record.entry(item.record).or_insert(item);
        }

        for (offset, record) in chunk.iter().enumerate() {
            let label = record_label(record);
            let Some(profile) = by_record.remove(&(offset + 1)) else {
                report
                    .errors
                    .push(format!("{label}: extractor returned no result"));
                continue;
            };

            let name = profile.name.trim();
            if name.is_empty() {
                report
                    .errors
                    .push(format!("{label}: extractor returned an empty name"));
                continue;
            }
            if !vocabulary.contains_cluster(&profile.cluster) {
                report.errors.push(format!(
                    "{label}: unknown cluster \"{}\"",
                    profile.cluster
                ));
                continue;
            }

            let mut tags = sanitize_tags(profile.tags, vocabulary, &label);
            tags.truncate(MAX_TAGS_PER_PROFILE);

            let new_profile = NewProfile {
                name: name.to_string(),
                cluster: profile.cluster,
                summary: profile.summary.trim().to_string(),
                goal: profile.goal.trim().to_string(),
                emoji: profile.emoji,
                tags: tags.clone(),
                telegram_id: record.author_id().map(str::to_string),
                post_url: record.message_link().map(str::to_string),
            };

            let outcome = self.store.upsert_profile(&new_profile)?;
            self.store.set_profile_tags(outcome.id, &tags, vocabulary)?;

            if outcome.created {
                report.imported += 1;
            } else {
                report.updated += 1;
            }
            *report.clusters.entry(new_profile.cluster).or_insert(0) += 1;
        }
        Ok(())
    }
}

/// Keep vocabulary tags only, preserving order, collapsing duplicates.
fn sanitize_tags(tags: Vec<String>, vocabulary: &Vocabulary, label: &str) -> Vec<String> {
    let mut accepted: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !vocabulary.contains_tag(&tag) {
            warn!(record = label, tag = %tag, "Dropping tag not in vocabulary");
            continue;
        }
        if !accepted.contains(&tag) {
            accepted.push(tag);
        }
    }
    accepted
}

/// Stable human-readable identifier for error messages.
fn record_label(record: &RawPost) -> String {
    if let Some(url) = record.message_link() {
        return url.to_string();
    }
    if let Some(id) = record.author_id() {
        return format!("author {id}");
    }
    match record.author.as_deref() {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => "unidentified record".to_string(),
    }
}
