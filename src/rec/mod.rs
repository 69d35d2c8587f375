//! Content-based recommendation engine.
//!
//! The orchestrator resolves a profile from the user's borrow history and
//! preference tags, vectorizes it together with the enrichable candidates,
//! ranks by cosine similarity, and maps the winners back to catalog records.
//! Users with no signal fall back to popularity ranking. The whole path is
//! synchronous, read-only, and independent per request.

pub mod cold_start;
pub mod profile;
pub mod rank;
pub mod vectorize;

use serde::{Deserialize, Serialize};

use crate::model::{Document, ItemRecord, ScoredCandidate};
use crate::store::CatalogStore;

/// Tuning knobs for the recommendation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Maximum number of records returned per request.
    pub max_results: usize,
    /// Minimum similarity score a ranked candidate must reach. `None` means
    /// no cutoff: any candidate, even at score zero, may fill the result.
    /// Does not apply to the popularity fallback, whose scores are ratings.
    pub min_score: Option<f32>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_score: None,
        }
    }
}

/// The recommendation orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Self {
        Self { config }
    }

    /// Produce recommendations for a user.
    ///
    /// Never fails: absence of data degrades to the cold-start fallback or
    /// an empty result, and stored state is never mutated.
    pub fn recommend(&self, store: &dyn CatalogStore, user_id: u64) -> Vec<ItemRecord> {
        let borrowed = store.borrowed_item_ids(user_id);
        let liked = store.items_by_ids(&borrowed);
        let preferences = store.preferences(user_id);

        let Some(profile_text) = profile::build_profile(&liked, &preferences) else {
            tracing::debug!(user_id, "no profile signal, using popularity fallback");
            let ranked = cold_start::rank_by_popularity(store, &borrowed);
            return self.resolve(store, &ranked);
        };

        // Candidates: not yet borrowed, and enriched with a usable summary.
        let candidates: Vec<(u64, String)> = store
            .all_items()
            .into_iter()
            .filter(|item| !borrowed.contains(&item.id))
            .filter_map(|item| {
                item.summary
                    .value()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| (item.id, s.clone()))
            })
            .collect();

        // Document 0 is the profile by convention.
        let mut docs = Vec::with_capacity(candidates.len() + 1);
        docs.push(Document {
            id: 0,
            text: profile_text,
        });
        docs.extend(candidates.iter().map(|(id, text)| Document {
            id: *id,
            text: text.clone(),
        }));

        let vectors = vectorize::Vectorizer.fit_transform(&docs);
        if vectors.is_empty() {
            // Profile exists but nothing enriched to compare against.
            tracing::debug!(user_id, "no enriched candidates to rank");
            return Vec::new();
        }

        let candidate_vectors: Vec<(u64, vectorize::TermVector)> = candidates
            .iter()
            .map(|(id, _)| *id)
            .zip(vectors[1..].iter().cloned())
            .collect();

        let mut ranked = rank::rank(&vectors[0], &candidate_vectors);
        if let Some(threshold) = self.config.min_score {
            ranked.retain(|c| c.score >= threshold);
        }

        tracing::debug!(
            user_id,
            candidates = candidate_vectors.len(),
            returned = ranked.len().min(self.config.max_results),
            "content-based ranking complete"
        );
        self.resolve(store, &ranked)
    }

    /// Map ranked candidates back to full records, capped to the configured
    /// result size. IDs deleted since scoring are silently skipped.
    fn resolve(&self, store: &dyn CatalogStore, ranked: &[ScoredCandidate]) -> Vec<ItemRecord> {
        let ids: Vec<u64> = ranked
            .iter()
            .take(self.config.max_results)
            .map(|c| c.id)
            .collect();
        store.items_by_ids(&ids)
    }
}
