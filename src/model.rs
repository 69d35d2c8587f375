//! Core data types for the catalog.
//!
//! Records mirror what the store hands the recommendation and enrichment
//! paths: items with AI-derived summaries, reviews with derived sentiment,
//! borrow history, and versioned user preferences.

use serde::{Deserialize, Serialize};

/// State of an AI-derived field.
///
/// Derived fields are populated by the enrichment pipeline after entity
/// creation. The pipeline only ever moves `Unprocessed`/`Processing` toward
/// `Complete` or `Failed`; a `Complete` value is never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value")]
pub enum Derived<T> {
    /// No enrichment job has touched the field yet.
    Unprocessed,
    /// A job has been picked up by the worker.
    Processing,
    /// Enrichment succeeded.
    Complete(T),
    /// Enrichment exhausted its retry budget; holds the last error message.
    Failed(String),
}

impl<T> Derived<T> {
    /// The computed value, if enrichment has succeeded.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Complete(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a terminal state (`Complete` or `Failed`) has been reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self::Unprocessed
    }
}

/// Review sentiment, normalized by the classification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u64,
    pub title: String,
    pub author: String,
    /// Raw source text the summary is derived from.
    pub source_text: String,
    /// AI-generated summary; feeds the recommender once `Complete`.
    #[serde(default)]
    pub summary: Derived<String>,
}

/// A user's review of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: u64,
    pub item_id: u64,
    pub user_id: u64,
    /// Star rating, 1–5.
    pub rating: u8,
    pub comment: String,
    /// AI-classified sentiment of the comment.
    #[serde(default)]
    pub sentiment: Derived<Sentiment>,
}

/// A borrow record. `returned` stays false while the borrow is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub user_id: u64,
    pub item_id: u64,
    pub returned: bool,
}

/// Versioned, discriminated user preference.
///
/// New preference kinds become new variants; the serde tag keeps stored
/// records readable without a storage migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Preference {
    /// Explicit topic interest, e.g. "science fiction".
    TopicTag { tag: String },
}

impl Preference {
    /// Free text this preference contributes to the user's profile document.
    pub fn profile_text(&self) -> &str {
        match self {
            Self::TopicTag { tag } => tag,
        }
    }
}

/// A text document handed to the vectorizer. Ephemeral: constructed per
/// recommendation request, never persisted.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: u64,
    pub text: String,
}

/// A ranked candidate produced by the similarity ranker.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: u64,
    /// Cosine similarity against the profile vector, in [0, 1].
    pub score: f32,
}
