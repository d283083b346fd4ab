//! Incremental response stream.
//!
//! A pull-based view of the response fragments in the
//! [`LatestWorkflowData`] slot that yields only fragments the consumer
//! has not seen yet.  The stream checks the slot once per tick; it ends
//! when the workflow reaches `Finished` with nothing left to deliver, or
//! when it is cancelled.
//!
//! Every stream starts with its cursor at zero.  Restarting means
//! building a new stream, which replays from the first fragment.

use std::collections::VecDeque;
use std::time::Duration;

use flowdeck_core::WorkflowPhase;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::latest::LatestWorkflowData;

/// Interval between checks of the slot.
pub const STREAM_TICK: Duration = Duration::from_secs(1);

/// Cursor over the response fragments of one workflow run.
pub struct ResponseStream {
    latest: LatestWorkflowData,
    /// Number of fragments already taken from the slot.
    cursor: usize,
    pending: VecDeque<String>,
    cancel: CancellationToken,
    tick: Duration,
    done: bool,
}

impl ResponseStream {
    pub fn new(latest: LatestWorkflowData) -> Self {
        Self {
            latest,
            cursor: 0,
            pending: VecDeque::new(),
            cancel: CancellationToken::new(),
            tick: STREAM_TICK,
            done: false,
        }
    }

    /// Check the slot every `tick` instead of every [`STREAM_TICK`].
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// A token that ends the stream when cancelled.  Cancellation takes
    /// effect at the latest on the next tick.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// End the stream.  Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fragments taken from the slot so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The next unseen fragment, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            if self.done {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.finish("cancelled");
                return None;
            }
            if let Some(fragment) = self.pending.pop_front() {
                return Some(fragment);
            }

            if let Some(snapshot) = self.latest.read() {
                let responses = &snapshot.responses;
                if responses.len() > self.cursor {
                    self.pending.extend(responses[self.cursor..].iter().cloned());
                    self.cursor = responses.len();
                    continue;
                }
                if responses.len() < self.cursor {
                    // A shorter list belongs to a new run, which may
                    // already hold fragments this stream has not seen.
                    tracing::debug!(
                        cursor = self.cursor,
                        available = responses.len(),
                        "Response list shrank; restarting from the new run",
                    );
                    self.cursor = 0;
                    continue;
                }
                if snapshot.phase() == WorkflowPhase::Finished {
                    self.finish("workflow finished");
                    return None;
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.tick) => {}
            }
        }
    }

    /// Adapt into a [`Stream`] of fragments.
    pub fn into_stream(self) -> impl Stream<Item = String> {
        futures::stream::unfold(self, |mut stream| async move {
            let fragment = stream.next().await?;
            Some((fragment, stream))
        })
    }

    fn finish(&mut self, reason: &str) {
        self.done = true;
        self.pending.clear();
        tracing::debug!(cursor = self.cursor, reason, "Response stream ended");
    }
}
