//! The shared "latest workflow data" slot.
//!
//! One slot per client, passed explicitly to whoever needs it.  The
//! reconciler is the only writer (plus [`reset`](LatestWorkflowData::reset)
//! on a new conversation); the sidebar and the response stream read it.
//! Readers get an `Arc` to an immutable snapshot that reflects the slot
//! at read time.

use std::sync::Arc;

use flowdeck_core::WorkflowSnapshot;
use tokio::sync::watch;

/// Current value of the slot: `None` until the first snapshot arrives
/// and after a reset.
pub type LatestValue = Option<Arc<WorkflowSnapshot>>;

/// Cheaply cloneable handle to the slot.
#[derive(Clone)]
pub struct LatestWorkflowData {
    tx: Arc<watch::Sender<LatestValue>>,
}

impl LatestWorkflowData {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new snapshot.
    pub fn update(&self, snapshot: impl Into<Arc<WorkflowSnapshot>>) {
        self.tx.send_replace(Some(snapshot.into()));
    }

    /// Empty the slot.
    pub fn reset(&self) {
        self.tx.send_replace(None);
    }

    /// The snapshot currently in the slot.
    pub fn read(&self) -> LatestValue {
        self.tx.borrow().clone()
    }

    /// Watch the slot for changes.
    pub fn subscribe(&self) -> watch::Receiver<LatestValue> {
        self.tx.subscribe()
    }
}

impl Default for LatestWorkflowData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use flowdeck_core::WorkflowPhase;

    use super::*;

    #[test]
    fn starts_empty() {
        assert!(LatestWorkflowData::new().read().is_none());
    }

    #[test]
    fn clones_share_the_slot() {
        let slot = LatestWorkflowData::new();
        let reader = slot.clone();

        slot.update(WorkflowSnapshot::empty(WorkflowPhase::Running));
        assert_eq!(reader.read().unwrap().phase(), WorkflowPhase::Running);

        slot.reset();
        assert!(reader.read().is_none());
    }

    #[test]
    fn earlier_reads_are_not_affected_by_updates() {
        let slot = LatestWorkflowData::new();
        slot.update(WorkflowSnapshot::empty(WorkflowPhase::Running));
        let before = slot.read().unwrap();

        slot.update(WorkflowSnapshot::empty(WorkflowPhase::Finished));
        assert_eq!(before.phase(), WorkflowPhase::Running);
        assert_eq!(slot.read().unwrap().phase(), WorkflowPhase::Finished);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let slot = LatestWorkflowData::new();
        let mut rx = slot.subscribe();

        slot.update(WorkflowSnapshot::empty(WorkflowPhase::Init));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().phase(), WorkflowPhase::Init);
    }
}
