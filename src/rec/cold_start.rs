//! Popularity fallback for users with no profile signal.

use crate::model::{ItemRecord, ScoredCandidate};
use crate::store::CatalogStore;

/// Rank the catalog by average user rating, descending.
///
/// Used when the profile builder finds no signal at all. Items with no
/// ratings coalesce to 0.0 rather than being excluded, items the user has
/// already borrowed are dropped, and ties break by ascending ID. An empty
/// catalog yields an empty ranking; this path never fails.
pub fn rank_by_popularity(store: &dyn CatalogStore, exclude: &[u64]) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = store
        .all_items()
        .into_iter()
        .filter(|item| !exclude.contains(&item.id))
        .map(|item: ItemRecord| ScoredCandidate {
            score: store.average_rating(item.id).unwrap_or(0.0),
            id: item.id,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    scored
}
