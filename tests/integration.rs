//! End-to-end tests of the catalog core: creation, enrichment, borrowing,
//! reviewing, and recommendations through the `Library` facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use lumina::config::LibraryConfig;
use lumina::engine::Library;
use lumina::error::LibraryError;
use lumina::llm::{LlmError, TextCapability};
use lumina::model::{Derived, Preference, Sentiment};

/// Deterministic capability: echoes a keyword summary and classifies by a
/// trivial keyword rule, optionally failing the first `failures` calls.
struct FakeCapability {
    failures: AtomicU32,
}

impl FakeCapability {
    fn reliable() -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(0),
        })
    }

    fn failing(times: u32) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(times),
        })
    }

    fn gate(&self) -> Result<(), LlmError> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(LlmError::RequestFailed {
                message: "fake outage".into(),
            });
        }
        Ok(())
    }
}

impl TextCapability for FakeCapability {
    fn summarize(&self, text: &str) -> Result<String, LlmError> {
        self.gate()?;
        Ok(text.to_string())
    }

    fn classify_sentiment(&self, review_text: &str) -> Result<Sentiment, LlmError> {
        self.gate()?;
        if review_text.contains("loved") {
            Ok(Sentiment::Positive)
        } else if review_text.contains("hated") {
            Ok(Sentiment::Negative)
        } else {
            Ok(Sentiment::Neutral)
        }
    }
}

fn fast_library(capability: Arc<FakeCapability>) -> Library {
    let mut config = LibraryConfig::default();
    config.enrich.initial_backoff_ms = 1;
    Library::new(config, capability).unwrap()
}

#[test]
fn added_item_gets_summarized() {
    let library = fast_library(FakeCapability::reliable());
    let item = library
        .add_item("Dune", "Frank Herbert", "space opera adventure")
        .unwrap();

    // The caller gets the record back before enrichment has run.
    assert_eq!(item.summary, Derived::Unprocessed);

    wait_for(&library, |l| {
        l.item(item.id).unwrap().summary.is_terminal()
    });
    assert_eq!(
        library.item(item.id).unwrap().summary,
        Derived::Complete("space opera adventure".into())
    );
    library.shutdown();
}

#[test]
fn enrichment_lands_and_feeds_recommendations() {
    let library = fast_library(FakeCapability::reliable());

    let liked = library
        .add_item("Liked", "A", "space opera adventure")
        .unwrap();
    let similar = library
        .add_item("Similar", "B", "space opera adventure")
        .unwrap();
    let other = library.add_item("Other", "C", "cooking recipes").unwrap();

    library.borrow_item(1, liked.id).unwrap();

    // Wait for all three summary jobs to drain.
    wait_for(&library, |l| {
        l.items().iter().all(|i| i.summary.is_terminal())
    });

    let picks = library.recommendations(1);
    assert_eq!(picks.len(), 2);
    assert_eq!(picks[0].id, similar.id);
    assert_eq!(picks[1].id, other.id);
    library.shutdown();
}

#[test]
fn cold_start_for_user_with_no_signal() {
    let library = fast_library(FakeCapability::reliable());

    let a = library.add_item("A", "X", "alpha").unwrap();
    let b = library.add_item("B", "Y", "beta").unwrap();

    // Another user rates item B highly.
    library.borrow_item(9, b.id).unwrap();
    wait_for(&library, |l| {
        l.items().iter().all(|i| i.summary.is_terminal())
    });
    library.post_review(9, b.id, 5, "loved every page").unwrap();

    // User 1 has no history and no tags: popularity fallback.
    let picks = library.recommendations(1);
    assert_eq!(picks.len(), 2);
    assert_eq!(picks[0].id, b.id);
    assert_eq!(picks[1].id, a.id);
    library.shutdown();
}

#[test]
fn review_rules_are_enforced() {
    let library = fast_library(FakeCapability::reliable());
    let item = library.add_item("A", "X", "text").unwrap();

    // Not borrowed yet.
    let err = library.post_review(1, item.id, 4, "nice").unwrap_err();
    assert!(matches!(err, LibraryError::NotBorrowed { .. }));

    library.borrow_item(1, item.id).unwrap();

    // Rating out of range.
    let err = library.post_review(1, item.id, 6, "nice").unwrap_err();
    assert!(matches!(err, LibraryError::InvalidRating { rating: 6 }));

    library.post_review(1, item.id, 4, "nice").unwrap();

    // Second review rejected.
    let err = library.post_review(1, item.id, 5, "again").unwrap_err();
    assert!(matches!(err, LibraryError::AlreadyReviewed { .. }));
    library.shutdown();
}

#[test]
fn borrow_rules_are_enforced() {
    let library = fast_library(FakeCapability::reliable());
    let item = library.add_item("A", "X", "text").unwrap();

    assert!(matches!(
        library.borrow_item(1, 999).unwrap_err(),
        LibraryError::Store(_)
    ));

    library.borrow_item(1, item.id).unwrap();
    assert!(matches!(
        library.borrow_item(1, item.id).unwrap_err(),
        LibraryError::AlreadyBorrowed { .. }
    ));

    library.return_item(1, item.id).unwrap();
    assert!(matches!(
        library.return_item(1, item.id).unwrap_err(),
        LibraryError::NoActiveBorrow { .. }
    ));

    // Borrowable again after return.
    library.borrow_item(1, item.id).unwrap();
    library.shutdown();
}

#[test]
fn review_sentiment_is_classified() {
    let library = fast_library(FakeCapability::reliable());
    let item = library.add_item("A", "X", "text").unwrap();
    library.borrow_item(1, item.id).unwrap();
    library.borrow_item(2, item.id).unwrap();

    library.post_review(1, item.id, 5, "loved it to bits").unwrap();
    library.post_review(2, item.id, 1, "hated the ending").unwrap();

    wait_for(&library, |l| {
        l.reviews(item.id).iter().all(|r| r.sentiment.is_terminal())
    });

    let reviews = library.reviews(item.id);
    assert_eq!(reviews[0].sentiment, Derived::Complete(Sentiment::Positive));
    assert_eq!(reviews[1].sentiment, Derived::Complete(Sentiment::Negative));
    library.shutdown();
}

#[test]
fn outage_dead_letters_and_reenrich_recovers() {
    // Three attempts per job; three failures sink the first job completely.
    let capability = FakeCapability::failing(3);
    let library = fast_library(capability);

    let item = library.add_item("A", "X", "island survival story").unwrap();
    wait_for(&library, |l| {
        l.items().iter().all(|i| i.summary.is_terminal())
    });

    assert!(matches!(
        library.item(item.id).unwrap().summary,
        Derived::Failed(_)
    ));
    // The field flips Failed just before the dead letter is recorded.
    wait_for(&library, |l| l.dead_letters().len() == 1);

    // Outage over (failures exhausted); manual re-trigger succeeds. A
    // Failed field is not terminal-for-reenrich: it has no Complete value.
    let submitted = library.reenrich_pending();
    assert_eq!(submitted, 1);
    wait_for(&library, |l| {
        matches!(l.item(item.id).unwrap().summary, Derived::Complete(_))
    });
    library.shutdown();
}

#[test]
fn enrichment_survives_entity_deletion() {
    let library = fast_library(FakeCapability::reliable());
    let doomed = library.add_item("Doomed", "X", "vanishing text").unwrap();
    let survivor = library.add_item("Survivor", "Y", "stable text").unwrap();

    // Delete before the worker necessarily got to it. Whichever side of the
    // race we land on, nothing may fail and the survivor must be intact.
    let _ = library.remove_item(doomed.id);

    wait_for(&library, |l| {
        l.item(survivor.id)
            .map(|i| i.summary.is_terminal())
            .unwrap_or(false)
    });
    assert!(matches!(
        library.item(survivor.id).unwrap().summary,
        Derived::Complete(_)
    ));
    assert_eq!(library.items().len(), 1);
    library.shutdown();
}

#[test]
fn recommendations_never_fail_during_enrichment() {
    // Capability that always fails: every summary stays un-Complete.
    let library = fast_library(FakeCapability::failing(u32::MAX));
    let a = library.add_item("A", "X", "alpha").unwrap();
    library.borrow_item(1, a.id).unwrap();

    // No enriched text anywhere: degrade, never error.
    let picks = library.recommendations(1);
    assert!(picks.is_empty() || picks.iter().all(|i| i.id != a.id));
    library.shutdown();
}

#[test]
fn catalog_persists_between_sessions() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = || {
        let mut c = LibraryConfig::default();
        c.data_dir = Some(dir.path().to_path_buf());
        c.enrich.initial_backoff_ms = 1;
        c
    };

    {
        let library = Library::new(config(), FakeCapability::reliable()).unwrap();
        let item = library
            .add_item("Persisted", "Author", "sea voyage tale")
            .unwrap();
        library.borrow_item(1, item.id).unwrap();
        library.shutdown(); // drains enrichment, summary flushed to disk
    }

    let library = Library::new(config(), FakeCapability::reliable()).unwrap();
    let items = library.items();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].summary,
        Derived::Complete("sea voyage tale".into())
    );
    library.shutdown();
}

#[test]
fn preference_tags_shape_recommendations() {
    let library = fast_library(FakeCapability::reliable());
    let space = library
        .add_item("Space", "A", "space opera adventure")
        .unwrap();
    let _food = library.add_item("Food", "B", "cooking recipes").unwrap();
    wait_for(&library, |l| {
        l.items().iter().all(|i| i.summary.is_terminal())
    });

    library
        .add_preference(
            7,
            Preference::TopicTag {
                tag: "space adventure".into(),
            },
        )
        .unwrap();

    let picks = library.recommendations(7);
    assert_eq!(picks[0].id, space.id);
    library.shutdown();
}

/// Poll the library until `done` holds (bounded at ~2s).
fn wait_for(library: &Library, done: impl Fn(&Library) -> bool) {
    for _ in 0..2000 {
        if done(library) {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    panic!("condition not reached within bound");
}
