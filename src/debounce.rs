//! Single-slot debouncer.
//!
//! Each trigger cancels the pending run and schedules a new one after the
//! quiet period. A run that has started is never cancelled: it clears the
//! slot before executing, so a trigger arriving mid-run schedules a fresh
//! follow-up run instead of aborting the current one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

type Job = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

pub struct Debouncer {
    quiet_period: Duration,
    job: Job,
    slot: Arc<Mutex<Slot>>,
    runtime: Handle,
}

impl Debouncer {
    /// Create a debouncer running `job` once per burst of triggers.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new<F, Fut>(quiet_period: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Arc::new(move || -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(job())
        });
        Self {
            quiet_period,
            job,
            slot: Arc::new(Mutex::new(Slot::default())),
            runtime: Handle::current(),
        }
    }

    /// Restart the quiet period; the job runs once it elapses untriggered.
    pub fn trigger(&self) {
        let mut slot = self.slot.lock();
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
        slot.generation += 1;

        let generation = slot.generation;
        let quiet_period = self.quiet_period;
        let job = Arc::clone(&self.job);
        let shared = Arc::clone(&self.slot);

        slot.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(quiet_period).await;
            {
                let mut slot = shared.lock();
                if slot.generation != generation {
                    return;
                }
                slot.pending = None;
            }
            trace!(generation, "debounce quiet period elapsed");
            job().await;
        }));
    }

    /// Whether a run is scheduled but has not started.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Drop the scheduled run, if any. A run already executing continues.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
