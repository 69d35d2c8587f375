//! Asynchronous enrichment pipeline.
//!
//! Entity creation submits a job and moves on; a dedicated worker thread
//! consumes the queue, calls the text capability, and writes the derived
//! field back through the store. The triggering caller never hears about the
//! outcome — failures are absorbed at the job boundary, logged, and retried
//! with exponential backoff until the attempt budget runs out, at which
//! point the job lands in the dead-letter list and the field is marked
//! `Failed`.
//!
//! The worker tolerates entities deleted mid-flight: the store's derived
//! writes are no-ops on missing IDs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::{SUMMARY_INPUT_CAP, TextCapability};
use crate::store::CatalogStore;

/// Which entity a job enriches; determines the derived field written back
/// (summary for items, sentiment for reviews).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Item,
    Review,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Item => "item",
            Self::Review => "review",
        })
    }
}

/// One unit of enrichment work, owned by the pipeline once submitted.
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub entity_id: u64,
    pub kind: EntityKind,
    pub source_text: String,
}

impl EnrichmentJob {
    pub fn item_summary(item_id: u64, source_text: impl Into<String>) -> Self {
        Self {
            entity_id: item_id,
            kind: EntityKind::Item,
            source_text: source_text.into(),
        }
    }

    pub fn review_sentiment(review_id: u64, comment: impl Into<String>) -> Self {
        Self {
            entity_id: review_id,
            kind: EntityKind::Review,
            source_text: comment.into(),
        }
    }
}

/// A job that exhausted its retry budget.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: EnrichmentJob,
    pub attempts: u32,
    pub reason: String,
}

/// Retry policy for the enrichment worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Total attempts per job, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles per subsequent retry.
    pub initial_backoff_ms: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

/// Queue/worker boundary decoupling enrichment from the request lifecycle.
pub struct EnrichmentQueue {
    tx: Option<Sender<EnrichmentJob>>,
    handle: Option<JoinHandle<()>>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
    completed: Arc<AtomicUsize>,
}

impl EnrichmentQueue {
    /// Spawn the worker thread.
    pub fn start(
        store: Arc<dyn CatalogStore>,
        capability: Arc<dyn TextCapability>,
        config: EnrichConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<EnrichmentJob>();
        let dead_letters = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));

        let worker_dead_letters = Arc::clone(&dead_letters);
        let worker_completed = Arc::clone(&completed);
        let handle = std::thread::Builder::new()
            .name("lumina-enrich".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    process_job(
                        &*store,
                        &*capability,
                        &config,
                        &worker_dead_letters,
                        job,
                    );
                    worker_completed.fetch_add(1, Ordering::SeqCst);
                }
                tracing::debug!("enrichment worker stopped");
            })
            .expect("spawn enrichment worker");

        Self {
            tx: Some(tx),
            handle: Some(handle),
            dead_letters,
            completed,
        }
    }

    /// Submit a job, fire-and-forget.
    ///
    /// Never blocks and never fails the caller; a dropped worker is logged
    /// and the job vanishes.
    pub fn submit(&self, job: EnrichmentJob) {
        let Some(ref tx) = self.tx else {
            return;
        };
        tracing::debug!(entity_id = job.entity_id, kind = %job.kind, "enrichment job queued");
        if tx.send(job).is_err() {
            tracing::warn!("enrichment worker is gone, job dropped");
        }
    }

    /// Jobs that exhausted their retry budget since startup.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().expect("dead-letter mutex").clone()
    }

    /// Number of jobs fully processed (success or dead-lettered).
    pub fn processed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Drain remaining jobs and stop the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                tracing::error!("enrichment worker panicked: {e:?}");
            }
        }
    }
}

impl Drop for EnrichmentQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EnrichmentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentQueue")
            .field("running", &self.handle.is_some())
            .field("processed", &self.processed_count())
            .finish()
    }
}

/// Run one job to a terminal outcome: `Complete`, or `Failed` + dead letter.
fn process_job(
    store: &dyn CatalogStore,
    capability: &dyn TextCapability,
    config: &EnrichConfig,
    dead_letters: &Mutex<Vec<DeadLetter>>,
    job: EnrichmentJob,
) {
    match job.kind {
        EntityKind::Item => store.begin_summary(job.entity_id),
        EntityKind::Review => store.begin_sentiment(job.entity_id),
    }

    let mut backoff = Duration::from_millis(config.initial_backoff_ms);
    let mut last_error = String::new();

    for attempt in 1..=config.max_attempts.max(1) {
        let outcome = match job.kind {
            EntityKind::Item => {
                // The capability contract caps summarizer input.
                let prefix: String = job.source_text.chars().take(SUMMARY_INPUT_CAP).collect();
                capability
                    .summarize(&prefix)
                    .map(|summary| store.complete_summary(job.entity_id, summary))
            }
            EntityKind::Review => capability
                .classify_sentiment(&job.source_text)
                .map(|sentiment| store.complete_sentiment(job.entity_id, sentiment)),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    entity_id = job.entity_id,
                    kind = %job.kind,
                    attempt,
                    "enrichment complete"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    entity_id = job.entity_id,
                    kind = %job.kind,
                    attempt,
                    error = %e,
                    "enrichment attempt failed"
                );
                last_error = e.to_string();
                if attempt < config.max_attempts {
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }
    }

    match job.kind {
        EntityKind::Item => store.fail_summary(job.entity_id, last_error.clone()),
        EntityKind::Review => store.fail_sentiment(job.entity_id, last_error.clone()),
    }
    tracing::warn!(
        entity_id = job.entity_id,
        kind = %job.kind,
        attempts = config.max_attempts,
        "enrichment dead-lettered"
    );
    dead_letters.lock().expect("dead-letter mutex").push(DeadLetter {
        attempts: config.max_attempts,
        reason: last_error,
        job,
    });
}
