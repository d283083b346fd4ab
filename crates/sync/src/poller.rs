//! Polling scheduler.
//!
//! [`Poller::start`] spawns a loop that fetches the backend state,
//! normalizes it, and hands the snapshot to a callback.  The next cycle
//! is scheduled one interval after the previous cycle *completed*, so a
//! slow backend never accumulates overlapping requests.
//!
//! Fetch failures are logged and forwarded to an optional error channel;
//! the cycle is skipped and the loop carries on at the normal cadence.

use std::sync::Arc;
use std::time::Duration;

use flowdeck_core::refresh::RefreshInterval;
use flowdeck_core::{normalize, SourceError, StateSource, WorkflowSnapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Configures and starts one polling loop.
pub struct Poller {
    source: Arc<dyn StateSource>,
    interval: Duration,
    errors: Option<mpsc::UnboundedSender<SourceError>>,
}

impl Poller {
    pub fn new(source: Arc<dyn StateSource>, interval: RefreshInterval) -> Self {
        Self {
            source,
            interval: interval.duration(),
            errors: None,
        }
    }

    /// Report fetch failures on `tx` in addition to logging them.
    pub fn with_error_channel(mut self, tx: mpsc::UnboundedSender<SourceError>) -> Self {
        self.errors = Some(tx);
        self
    }

    /// Start polling.  The first fetch happens immediately.
    ///
    /// `on_snapshot` runs on the polling task, once per successful
    /// fetch, and never after [`PollingHandle::stop`] has been called.
    pub fn start<F>(self, mut on_snapshot: F) -> PollingHandle
    where
        F: FnMut(WorkflowSnapshot) + Send + 'static,
    {
        let Poller {
            source,
            interval,
            errors,
        } = self;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let loop_id = Uuid::new_v4();

        let task = tokio::spawn(async move {
            tracing::debug!(
                %loop_id,
                interval_ms = interval.as_millis() as u64,
                "Polling started",
            );

            loop {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = source.fetch_state() => result,
                };

                match result {
                    Ok(raw) => on_snapshot(normalize(&raw)),
                    Err(e) => {
                        tracing::warn!(%loop_id, error = %e, "State fetch failed");
                        if let Some(tx) = &errors {
                            // The receiver may have gone away; the loop keeps running.
                            let _ = tx.send(e);
                        }
                    }
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            tracing::debug!(%loop_id, "Polling stopped");
        });

        PollingHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Lifecycle token for a running poll loop.
///
/// Dropping the handle stops the loop.
pub struct PollingHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Stop the loop.  Safe to call any number of times.
    ///
    /// A pending delay is cancelled; a fetch in flight is abandoned and
    /// its result is never delivered.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop is still scheduled to run.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the loop task to exit.  Call [`stop`](Self::stop) first.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Polling task panicked");
            }
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
