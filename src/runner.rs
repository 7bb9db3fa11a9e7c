//! The batch scheduler: bounded parallelism over independent entries.
//!
//! `run` validates entries eagerly in input order (invalid ones are marked
//! Skipped and never scheduled), then executes the rest as independent
//! state machines with at most `concurrency` in flight. A single shared
//! atomic flag carries cancellation to every worker; `cancel()` only sets
//! the flag — in-flight requests are never interrupted, and each entry
//! settles at its next checkpoint.
//!
//! `run` always returns normally: per-entry failures land in the entries,
//! and a very large wait bound guarantees return even if the service hangs.

use crate::config::BatchConfig;
use crate::entry::BatchEntry;
use crate::pipeline::{validate::Validator, worker};
use crate::profile::ConversionProfile;
use crate::remote::ConversionService;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs batch conversions with configurable concurrency.
pub struct BatchRunner {
    service: Arc<dyn ConversionService>,
    validator: Validator,
    config: BatchConfig,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    /// `catalogue` is the set of known profiles, used to derive the
    /// validator's allowed extensions.
    pub fn new(
        service: Arc<dyn ConversionService>,
        catalogue: &[ConversionProfile],
        config: BatchConfig,
    ) -> Self {
        Self {
            service,
            validator: Validator::new(catalogue),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run every entry to a terminal state.
    ///
    /// Invalid entries are Skipped without being scheduled. Completion order
    /// across entries is arbitrary; no entry's failure affects another.
    /// Returns once all scheduled work has finished, or after the configured
    /// wait bound.
    pub async fn run(&self, entries: &[Arc<BatchEntry>]) {
        self.cancel.store(false, Ordering::SeqCst);

        let mut scheduled: Vec<Arc<BatchEntry>> = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.cancel.load(Ordering::SeqCst) {
                info!("cancel requested, not scheduling remaining entries");
                break;
            }
            match self.validator.validate(entry.input(), entry.profile()) {
                Err(reason) => {
                    warn!("skipping {}: {reason}", entry.input().display());
                    entry.mark_skipped(reason);
                }
                Ok(()) => scheduled.push(Arc::clone(entry)),
            }
        }

        info!(
            "running batch: {} of {} entries scheduled, concurrency {}",
            scheduled.len(),
            entries.len(),
            self.config.concurrency
        );

        let work = stream::iter(scheduled.iter().map(|entry| {
            let entry = Arc::clone(entry);
            let service = Arc::clone(&self.service);
            let cancel = Arc::clone(&self.cancel);
            let validator = &self.validator;
            let config = &self.config;
            async move {
                worker::run_entry(&entry, &service, validator, config, &cancel).await;
            }
        }))
        .buffer_unordered(self.config.concurrency)
        .collect::<Vec<()>>();

        if tokio::time::timeout(self.config.run_timeout, work).await.is_err() {
            warn!(
                "batch run exceeded its {:?} wait bound, returning with work incomplete",
                self.config.run_timeout
            );
        }
    }

    /// Request cooperative cancellation of the current run.
    ///
    /// Only sets the shared flag; each in-flight entry observes it at its
    /// next checkpoint and settles into Canceled. The flag stays set for the
    /// remainder of the run and is reset by the next `run` call.
    pub fn cancel(&self) {
        info!("batch cancel requested");
        self.cancel.store(true, Ordering::SeqCst);
    }
}
