//! Live workflow monitor: poller → normalizer → reconciler.
//!
//! [`WorkflowMonitor`] is the assembled synchronization loop.  Each
//! polled snapshot is reconciled, which in turn broadcasts updates,
//! refreshes the latest-data slot, and archives finished runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flowdeck_core::refresh::RefreshInterval;
use flowdeck_core::{SourceError, StateSource, WorkflowSnapshot};
use tokio::sync::{broadcast, mpsc};

use crate::poller::{Poller, PollingHandle};
use crate::reconciler::{Reconciler, WorkflowUpdate};

/// A running synchronization loop.
///
/// Dropping the monitor stops polling.
pub struct WorkflowMonitor {
    reconciler: Arc<Mutex<Reconciler>>,
    polling: PollingHandle,
}

impl WorkflowMonitor {
    /// Start polling `source` every `interval`, feeding `reconciler`.
    ///
    /// Subscribe on the reconciler before calling this to be sure of
    /// seeing the very first update.  Fetch failures are sent on
    /// `errors` when given.
    pub fn start(
        source: Arc<dyn StateSource>,
        interval: RefreshInterval,
        reconciler: Reconciler,
        errors: Option<mpsc::UnboundedSender<SourceError>>,
    ) -> Self {
        let reconciler = Arc::new(Mutex::new(reconciler));
        let shared = Arc::clone(&reconciler);

        let mut poller = Poller::new(source, interval);
        if let Some(tx) = errors {
            poller = poller.with_error_channel(tx);
        }
        let polling = poller.start(move |snapshot| {
            lock(&shared).apply(snapshot);
        });

        tracing::info!(
            interval_ms = interval.duration().as_millis() as u64,
            "Workflow monitor started",
        );
        Self {
            reconciler,
            polling,
        }
    }

    /// Receive reconciled updates from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowUpdate> {
        lock(&self.reconciler).subscribe()
    }

    /// The reconciler's current snapshot.
    pub fn current(&self) -> Option<Arc<WorkflowSnapshot>> {
        lock(&self.reconciler).current()
    }

    pub fn is_active(&self) -> bool {
        self.polling.is_active()
    }

    /// Stop polling.  Idempotent.
    pub fn stop(&self) {
        if self.polling.is_active() {
            tracing::info!("Workflow monitor stopping");
        }
        self.polling.stop();
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.stop();
        self.polling.join().await;
    }
}

fn lock(reconciler: &Mutex<Reconciler>) -> MutexGuard<'_, Reconciler> {
    reconciler.lock().unwrap_or_else(PoisonError::into_inner)
}
