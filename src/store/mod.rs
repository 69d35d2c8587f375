//! Catalog store: the entity-store contract and its JSON-backed implementation.
//!
//! The recommendation path only reads; the enrichment worker only writes
//! derived fields. Derived-field writes are deliberately tolerant: writing to
//! an ID that no longer exists is a silent no-op, never an error, because the
//! entity may have been deleted between job submission and write-back.
//!
//! `Catalog` keeps everything in memory (`DashMap` per record kind) and, when
//! given a data directory, flushes the whole state to `catalog.json` after
//! each mutation. Flushes are serialized and land via a same-directory temp
//! file renamed over the catalog, so a caller-thread mutation racing the
//! enrichment worker's write-back can never leave a torn file behind.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::model::{BorrowRecord, Derived, ItemRecord, Preference, ReviewRecord, Sentiment};

/// Read/write contract the core depends on.
///
/// The recommendation orchestrator and the enrichment worker both hold this
/// trait, not the concrete store.
pub trait CatalogStore: Send + Sync {
    /// Fetch a single item by ID.
    fn item(&self, id: u64) -> Option<ItemRecord>;
    /// Fetch items by ID set, skipping missing IDs.
    fn items_by_ids(&self, ids: &[u64]) -> Vec<ItemRecord>;
    /// All items in the catalog.
    fn all_items(&self) -> Vec<ItemRecord>;
    /// IDs of items the user has ever borrowed (returned or not).
    fn borrowed_item_ids(&self, user_id: u64) -> Vec<u64>;
    /// The user's stored preferences.
    fn preferences(&self, user_id: u64) -> Vec<Preference>;
    /// All reviews for an item.
    fn reviews_for(&self, item_id: u64) -> Vec<ReviewRecord>;
    /// Average review rating for an item, `None` when unrated.
    fn average_rating(&self, item_id: u64) -> Option<f32>;

    /// Mark an item's summary as picked up by the worker. No-op on a missing
    /// ID or a field already in a terminal state.
    fn begin_summary(&self, item_id: u64);
    /// Write a successful summary. No-op on a missing ID or an already
    /// `Complete` field.
    fn complete_summary(&self, item_id: u64, summary: String);
    /// Record summary enrichment failure. No-op on a missing ID or a field
    /// already `Complete`.
    fn fail_summary(&self, item_id: u64, reason: String);

    /// Sentiment counterparts of the summary writes, keyed by review ID.
    fn begin_sentiment(&self, review_id: u64);
    fn complete_sentiment(&self, review_id: u64, sentiment: Sentiment);
    fn fail_sentiment(&self, review_id: u64, reason: String);
}

/// Serializable snapshot of the full catalog state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogState {
    next_item_id: u64,
    next_review_id: u64,
    items: Vec<ItemRecord>,
    reviews: Vec<ReviewRecord>,
    borrows: Vec<BorrowRecord>,
    preferences: Vec<(u64, Vec<Preference>)>,
}

/// In-memory catalog with optional JSON persistence.
pub struct Catalog {
    path: Option<PathBuf>,
    // Serializes snapshot+write; concurrent flushes must not interleave.
    flush_lock: Mutex<()>,
    items: DashMap<u64, ItemRecord>,
    reviews: DashMap<u64, ReviewRecord>,
    borrows: Mutex<Vec<BorrowRecord>>,
    preferences: DashMap<u64, Vec<Preference>>,
    next_item_id: AtomicU64,
    next_review_id: AtomicU64,
}

impl Catalog {
    /// Create a memory-only catalog.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            flush_lock: Mutex::new(()),
            items: DashMap::new(),
            reviews: DashMap::new(),
            borrows: Mutex::new(Vec::new()),
            preferences: DashMap::new(),
            next_item_id: AtomicU64::new(1),
            next_review_id: AtomicU64::new(1),
        }
    }

    /// Open or create a catalog at the given directory.
    ///
    /// The catalog file is `{dir}/catalog.json`. If it doesn't exist, starts
    /// empty.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let path = dir.join("catalog.json");

        let state = if path.exists() {
            let data = std::fs::read_to_string(&path).map_err(|e| StoreError::CatalogIo {
                message: format!("read {}: {e}", path.display()),
            })?;
            serde_json::from_str(&data).map_err(|e| StoreError::Serialization {
                message: format!("parse {}: {e}", path.display()),
            })?
        } else {
            CatalogState {
                next_item_id: 1,
                next_review_id: 1,
                ..Default::default()
            }
        };

        let catalog = Self {
            path: Some(path),
            flush_lock: Mutex::new(()),
            items: state.items.into_iter().map(|i| (i.id, i)).collect(),
            reviews: state.reviews.into_iter().map(|r| (r.id, r)).collect(),
            borrows: Mutex::new(state.borrows),
            preferences: state.preferences.into_iter().collect(),
            next_item_id: AtomicU64::new(state.next_item_id.max(1)),
            next_review_id: AtomicU64::new(state.next_review_id.max(1)),
        };
        Ok(catalog)
    }

    /// Flush the catalog to disk, if persistent.
    ///
    /// The caller thread and the enrichment worker both end up here; the
    /// flush lock keeps their truncate-then-write sequences from
    /// interleaving, and the rename makes each landed file all-or-nothing.
    fn flush(&self) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().expect("flush mutex");

        let mut state = CatalogState {
            next_item_id: self.next_item_id.load(Ordering::SeqCst),
            next_review_id: self.next_review_id.load(Ordering::SeqCst),
            items: self.items.iter().map(|e| e.value().clone()).collect(),
            reviews: self.reviews.iter().map(|e| e.value().clone()).collect(),
            borrows: self.borrows.lock().expect("borrows mutex").clone(),
            preferences: self
                .preferences
                .iter()
                .map(|e| (*e.key(), e.value().clone()))
                .collect(),
        };
        // Stable on-disk order, so the file diffs cleanly.
        state.items.sort_by_key(|i| i.id);
        state.reviews.sort_by_key(|r| r.id);
        state.preferences.sort_by_key(|(user, _)| *user);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CatalogIo {
                message: format!("create dir {}: {e}", parent.display()),
            })?;
        }
        let json = serde_json::to_string_pretty(&state).map_err(|e| StoreError::Serialization {
            message: format!("serialize catalog: {e}"),
        })?;

        // Write to a sibling temp file, then rename over the catalog so a
        // reader never observes a partially written file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::CatalogIo {
            message: format!("write {}: {e}", tmp.display()),
        })?;
        std::fs::rename(&tmp, path).map_err(|e| StoreError::CatalogIo {
            message: format!("rename {} over {}: {e}", tmp.display(), path.display()),
        })?;
        Ok(())
    }

    /// Add a new item; assigns the next ID and returns the stored record.
    pub fn add_item(
        &self,
        title: impl Into<String>,
        author: impl Into<String>,
        source_text: impl Into<String>,
    ) -> StoreResult<ItemRecord> {
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst);
        let record = ItemRecord {
            id,
            title: title.into(),
            author: author.into(),
            source_text: source_text.into(),
            summary: Derived::Unprocessed,
        };
        self.items.insert(id, record.clone());
        self.flush()?;
        Ok(record)
    }

    /// Remove an item. Returns the removed record, or error if not found.
    pub fn remove_item(&self, id: u64) -> StoreResult<ItemRecord> {
        let (_, record) = self
            .items
            .remove(&id)
            .ok_or(StoreError::ItemNotFound { id })?;
        self.flush()?;
        Ok(record)
    }

    /// Record a borrow. Caller enforces the no-double-borrow rule.
    pub fn add_borrow(&self, user_id: u64, item_id: u64) -> StoreResult<BorrowRecord> {
        let record = BorrowRecord {
            user_id,
            item_id,
            returned: false,
        };
        self.borrows
            .lock()
            .expect("borrows mutex")
            .push(record.clone());
        self.flush()?;
        Ok(record)
    }

    /// Whether the user currently holds an unreturned borrow of the item.
    pub fn has_active_borrow(&self, user_id: u64, item_id: u64) -> bool {
        self.borrows
            .lock()
            .expect("borrows mutex")
            .iter()
            .any(|b| b.user_id == user_id && b.item_id == item_id && !b.returned)
    }

    /// Mark the user's active borrow of the item as returned.
    ///
    /// Returns false when no active borrow exists.
    pub fn mark_returned(&self, user_id: u64, item_id: u64) -> StoreResult<bool> {
        let found = {
            let mut borrows = self.borrows.lock().expect("borrows mutex");
            match borrows
                .iter_mut()
                .find(|b| b.user_id == user_id && b.item_id == item_id && !b.returned)
            {
                Some(b) => {
                    b.returned = true;
                    true
                }
                None => false,
            }
        };
        if found {
            self.flush()?;
        }
        Ok(found)
    }

    /// Add a review; assigns the next ID and returns the stored record.
    pub fn add_review(
        &self,
        user_id: u64,
        item_id: u64,
        rating: u8,
        comment: impl Into<String>,
    ) -> StoreResult<ReviewRecord> {
        let id = self.next_review_id.fetch_add(1, Ordering::SeqCst);
        let record = ReviewRecord {
            id,
            item_id,
            user_id,
            rating,
            comment: comment.into(),
            sentiment: Derived::Unprocessed,
        };
        self.reviews.insert(id, record.clone());
        self.flush()?;
        Ok(record)
    }

    /// The user's review of an item, if any.
    pub fn user_review(&self, user_id: u64, item_id: u64) -> Option<ReviewRecord> {
        self.reviews
            .iter()
            .find(|e| e.value().user_id == user_id && e.value().item_id == item_id)
            .map(|e| e.value().clone())
    }

    /// Append a preference for the user.
    pub fn add_preference(&self, user_id: u64, pref: Preference) -> StoreResult<()> {
        self.preferences.entry(user_id).or_default().push(pref);
        self.flush()
    }

    /// Number of items in the catalog.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn update_summary(&self, item_id: u64, update: impl FnOnce(&mut Derived<String>)) {
        if let Some(mut entry) = self.items.get_mut(&item_id) {
            update(&mut entry.summary);
            drop(entry);
            if let Err(e) = self.flush() {
                tracing::warn!(item_id, error = %e, "catalog flush after summary write failed");
            }
        } else {
            tracing::debug!(item_id, "summary write to missing item ignored");
        }
    }

    fn update_sentiment(&self, review_id: u64, update: impl FnOnce(&mut Derived<Sentiment>)) {
        if let Some(mut entry) = self.reviews.get_mut(&review_id) {
            update(&mut entry.sentiment);
            drop(entry);
            if let Err(e) = self.flush() {
                tracing::warn!(review_id, error = %e, "catalog flush after sentiment write failed");
            }
        } else {
            tracing::debug!(review_id, "sentiment write to missing review ignored");
        }
    }
}

impl CatalogStore for Catalog {
    fn item(&self, id: u64) -> Option<ItemRecord> {
        self.items.get(&id).map(|e| e.value().clone())
    }

    fn items_by_ids(&self, ids: &[u64]) -> Vec<ItemRecord> {
        ids.iter()
            .filter_map(|id| self.items.get(id).map(|e| e.value().clone()))
            .collect()
    }

    fn all_items(&self) -> Vec<ItemRecord> {
        let mut items: Vec<ItemRecord> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|i| i.id);
        items
    }

    fn borrowed_item_ids(&self, user_id: u64) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .borrows
            .lock()
            .expect("borrows mutex")
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.item_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn preferences(&self, user_id: u64) -> Vec<Preference> {
        self.preferences
            .get(&user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    fn reviews_for(&self, item_id: u64) -> Vec<ReviewRecord> {
        let mut reviews: Vec<ReviewRecord> = self
            .reviews
            .iter()
            .filter(|e| e.value().item_id == item_id)
            .map(|e| e.value().clone())
            .collect();
        reviews.sort_by_key(|r| r.id);
        reviews
    }

    fn average_rating(&self, item_id: u64) -> Option<f32> {
        let reviews = self.reviews_for(item_id);
        if reviews.is_empty() {
            return None;
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(sum as f32 / reviews.len() as f32)
    }

    fn begin_summary(&self, item_id: u64) {
        self.update_summary(item_id, |summary| {
            if !summary.is_terminal() {
                *summary = Derived::Processing;
            }
        });
    }

    fn complete_summary(&self, item_id: u64, value: String) {
        self.update_summary(item_id, |summary| {
            if !matches!(summary, Derived::Complete(_)) {
                *summary = Derived::Complete(value);
            }
        });
    }

    fn fail_summary(&self, item_id: u64, reason: String) {
        self.update_summary(item_id, |summary| {
            if !matches!(summary, Derived::Complete(_)) {
                *summary = Derived::Failed(reason);
            }
        });
    }

    fn begin_sentiment(&self, review_id: u64) {
        self.update_sentiment(review_id, |sentiment| {
            if !sentiment.is_terminal() {
                *sentiment = Derived::Processing;
            }
        });
    }

    fn complete_sentiment(&self, review_id: u64, value: Sentiment) {
        self.update_sentiment(review_id, |sentiment| {
            if !matches!(sentiment, Derived::Complete(_)) {
                *sentiment = Derived::Complete(value);
            }
        });
    }

    fn fail_sentiment(&self, review_id: u64, reason: String) {
        self.update_sentiment(review_id, |sentiment| {
            if !matches!(sentiment, Derived::Complete(_)) {
                *sentiment = Derived::Failed(reason);
            }
        });
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("path", &self.path)
            .field("items", &self.items.len())
            .field("reviews", &self.reviews.len())
            .finish()
    }
}
