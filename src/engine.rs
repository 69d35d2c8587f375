//! Library facade: top-level API for the catalog service core.
//!
//! Owns the store, the recommender, and the enrichment queue, and exposes
//! the operations a surrounding request surface would call. Creation
//! operations (add item, post review) schedule enrichment jobs after the
//! record is stored, outside the caller's critical path.

use std::sync::Arc;

use crate::config::LibraryConfig;
use crate::enrich::{DeadLetter, EnrichmentJob, EnrichmentQueue};
use crate::error::{LibraryError, LibraryResult, StoreError};
use crate::llm::TextCapability;
use crate::model::{BorrowRecord, ItemRecord, Preference, ReviewRecord};
use crate::rec::Recommender;
use crate::store::{Catalog, CatalogStore};

/// The catalog service core.
pub struct Library {
    store: Arc<Catalog>,
    recommender: Recommender,
    queue: EnrichmentQueue,
}

impl Library {
    /// Create the core with the given configuration and text capability.
    ///
    /// Opens (or creates) the persistent catalog when `data_dir` is set and
    /// starts the enrichment worker.
    pub fn new(
        config: LibraryConfig,
        capability: Arc<dyn TextCapability>,
    ) -> LibraryResult<Self> {
        let store = Arc::new(match config.data_dir {
            Some(ref dir) => Catalog::open(dir)?,
            None => Catalog::in_memory(),
        });

        tracing::info!(
            persistent = config.data_dir.is_some(),
            items = store.item_count(),
            "opening catalog"
        );

        let queue = EnrichmentQueue::start(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            capability,
            config.enrich.clone(),
        );

        Ok(Self {
            store,
            recommender: Recommender::new(config.recommend),
            queue,
        })
    }

    /// Add a catalog item and schedule its summary enrichment.
    pub fn add_item(
        &self,
        title: impl Into<String>,
        author: impl Into<String>,
        source_text: impl Into<String>,
    ) -> LibraryResult<ItemRecord> {
        let item = self.store.add_item(title, author, source_text)?;
        self.queue
            .submit(EnrichmentJob::item_summary(item.id, item.source_text.clone()));
        Ok(item)
    }

    /// All items in the catalog.
    pub fn items(&self) -> Vec<ItemRecord> {
        self.store.all_items()
    }

    /// Fetch one item.
    pub fn item(&self, id: u64) -> LibraryResult<ItemRecord> {
        self.store
            .item(id)
            .ok_or(StoreError::ItemNotFound { id }.into())
    }

    /// Remove an item. In-flight enrichment for it becomes a no-op.
    pub fn remove_item(&self, id: u64) -> LibraryResult<ItemRecord> {
        Ok(self.store.remove_item(id)?)
    }

    /// Borrow an item.
    pub fn borrow_item(&self, user_id: u64, item_id: u64) -> LibraryResult<BorrowRecord> {
        if self.store.item(item_id).is_none() {
            return Err(StoreError::ItemNotFound { id: item_id }.into());
        }
        if self.store.has_active_borrow(user_id, item_id) {
            return Err(LibraryError::AlreadyBorrowed { user_id, item_id });
        }
        Ok(self.store.add_borrow(user_id, item_id)?)
    }

    /// Return a borrowed item.
    pub fn return_item(&self, user_id: u64, item_id: u64) -> LibraryResult<()> {
        if self.store.mark_returned(user_id, item_id)? {
            Ok(())
        } else {
            Err(LibraryError::NoActiveBorrow { user_id, item_id })
        }
    }

    /// Post a review and schedule its sentiment enrichment.
    ///
    /// The user must have borrowed the item at least once, gets one review
    /// per item, and ratings are 1–5 stars.
    pub fn post_review(
        &self,
        user_id: u64,
        item_id: u64,
        rating: u8,
        comment: impl Into<String>,
    ) -> LibraryResult<ReviewRecord> {
        if !(1..=5).contains(&rating) {
            return Err(LibraryError::InvalidRating { rating });
        }
        if self.store.item(item_id).is_none() {
            return Err(StoreError::ItemNotFound { id: item_id }.into());
        }
        if !self.store.borrowed_item_ids(user_id).contains(&item_id) {
            return Err(LibraryError::NotBorrowed { user_id, item_id });
        }
        if self.store.user_review(user_id, item_id).is_some() {
            return Err(LibraryError::AlreadyReviewed { user_id, item_id });
        }

        let review = self.store.add_review(user_id, item_id, rating, comment)?;
        self.queue.submit(EnrichmentJob::review_sentiment(
            review.id,
            review.comment.clone(),
        ));
        Ok(review)
    }

    /// All reviews for an item.
    pub fn reviews(&self, item_id: u64) -> Vec<ReviewRecord> {
        self.store.reviews_for(item_id)
    }

    /// Record a user preference.
    pub fn add_preference(&self, user_id: u64, pref: Preference) -> LibraryResult<()> {
        Ok(self.store.add_preference(user_id, pref)?)
    }

    /// Content-based recommendations for a user, falling back to popularity
    /// when the user has no signal. Never fails.
    pub fn recommendations(&self, user_id: u64) -> Vec<ItemRecord> {
        self.recommender.recommend(&*self.store, user_id)
    }

    /// Enrichment jobs that exhausted their retry budget.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.queue.dead_letters()
    }

    /// Direct store access, for collaborators that only need reads.
    pub fn store(&self) -> &Catalog {
        &self.store
    }

    /// Re-submit enrichment for every entity whose derived field is not yet
    /// `Complete` (manual re-trigger for dead-lettered or stale entities).
    pub fn reenrich_pending(&self) -> usize {
        let mut submitted = 0;
        for item in self.store.all_items() {
            if item.summary.value().is_none() {
                self.queue
                    .submit(EnrichmentJob::item_summary(item.id, item.source_text));
                submitted += 1;
            }
        }
        for item_id in self.store.all_items().iter().map(|i| i.id) {
            for review in self.store.reviews_for(item_id) {
                if review.sentiment.value().is_none() {
                    self.queue
                        .submit(EnrichmentJob::review_sentiment(review.id, review.comment));
                    submitted += 1;
                }
            }
        }
        submitted
    }

    /// Drain the enrichment queue and stop the worker.
    pub fn shutdown(self) {
        self.queue.shutdown();
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("store", &self.store)
            .field("queue", &self.queue)
            .finish()
    }
}
