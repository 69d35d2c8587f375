//! Cosine-similarity ranking of candidate vectors against a profile vector.

use crate::model::ScoredCandidate;

use super::vectorize::TermVector;

/// Score every candidate against the profile and sort the full set.
///
/// Vectors are non-negative and L2-normalized, so the dot product is a
/// cosine similarity in [0, 1]; it is clamped anyway to absorb floating
/// error. Sorted by descending score with ties broken by ascending
/// candidate ID, so repeated calls with identical input produce identical
/// output. Truncation to a result cap is the orchestrator's job, not ours.
pub fn rank(profile: &TermVector, candidates: &[(u64, TermVector)]) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|(id, vec)| ScoredCandidate {
            id: *id,
            score: profile.dot(vec).clamp(0.0, 1.0),
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
