//! Profile document construction.
//!
//! A user's profile is one synthetic document: the summaries of items they
//! have borrowed plus their explicit preference tags, each tag treated as an
//! independent short document and merged the same way.

use crate::model::{ItemRecord, Preference};

/// Merge liked item summaries and preference tags into a profile document.
///
/// Only `Complete` summaries contribute; items still awaiting enrichment are
/// skipped. Returns `None` when no source has real content, which is the
/// cold-start signal to the orchestrator. A degenerate empty-string profile
/// is never produced.
pub fn build_profile(liked_items: &[ItemRecord], preferences: &[Preference]) -> Option<String> {
    let mut parts: Vec<&str> = liked_items
        .iter()
        .filter_map(|item| item.summary.value())
        .map(String::as_str)
        .filter(|text| !text.trim().is_empty())
        .collect();

    parts.extend(
        preferences
            .iter()
            .map(Preference::profile_text)
            .filter(|tag| !tag.trim().is_empty()),
    );

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
