//! State reconciler.
//!
//! Owns the single current snapshot and classifies every incoming one by
//! lifecycle phase:
//!
//! | Phase      | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `Init`     | current node set cleared (fresh run starting)          |
//! | `Running`  | current snapshot replaced wholesale                    |
//! | `Finished` | replaced, then handed to the [`HistoryArchive`]        |
//! | `Error`    | replaced as-is; display only, never archived           |
//!
//! Accepted snapshots are broadcast as [`WorkflowUpdate`]s and written to
//! the [`LatestWorkflowData`] slot.  A snapshot deep-equal to the current
//! one is a no-op and is not republished.

use std::collections::BTreeMap;
use std::sync::Arc;

use flowdeck_core::node_status::DisplayStatus;
use flowdeck_core::{WorkflowPhase, WorkflowSnapshot};
use tokio::sync::broadcast;

use crate::archive::HistoryArchive;
use crate::latest::LatestWorkflowData;

/// Broadcast channel capacity for workflow updates.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// How an accepted snapshot relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// `Init`: a fresh run; consumers should drop what they render.
    Reset,
    /// Same phase and nodes; only new response fragments were appended.
    Append,
    /// Anything else: consumers re-render from the snapshot.
    Replace,
    /// Deep-equal to the current snapshot.  Never broadcast.
    Unchanged,
}

/// A node whose display status differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChange {
    pub name: String,
    /// `None` when the node was not in the previous snapshot.
    pub previous: Option<DisplayStatus>,
    pub current: DisplayStatus,
}

/// Outcome of reconciling one snapshot.
#[derive(Debug, Clone)]
pub struct WorkflowUpdate {
    pub kind: UpdateKind,
    pub phase: WorkflowPhase,
    /// Phase of the previous snapshot; `None` for the first snapshot.
    pub previous_phase: Option<WorkflowPhase>,
    /// Response fragments not present in the previous snapshot.
    pub new_responses: Vec<String>,
    pub node_changes: Vec<NodeChange>,
    /// The snapshot now held as current.
    pub snapshot: Arc<WorkflowSnapshot>,
    /// Whether this update added a record to the history archive.
    pub archived: bool,
}

impl WorkflowUpdate {
    /// Whether this update entered a phase the previous snapshot was not in.
    pub fn is_transition(&self) -> bool {
        self.previous_phase != Some(self.phase)
    }
}

/// Owner of the current workflow snapshot.
pub struct Reconciler {
    current: Option<Arc<WorkflowSnapshot>>,
    latest: LatestWorkflowData,
    archive: Option<Arc<HistoryArchive>>,
    update_tx: broadcast::Sender<WorkflowUpdate>,
}

impl Reconciler {
    pub fn new(latest: LatestWorkflowData) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            current: None,
            latest,
            archive: None,
            update_tx,
        }
    }

    /// Archive `Finished` snapshots into `archive`.
    pub fn with_archive(mut self, archive: Arc<HistoryArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Receive every accepted update.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowUpdate> {
        self.update_tx.subscribe()
    }

    /// The current snapshot, or `None` before the first one arrives.
    pub fn current(&self) -> Option<Arc<WorkflowSnapshot>> {
        self.current.clone()
    }

    /// Reconcile `incoming` against the current snapshot.
    pub fn apply(&mut self, incoming: WorkflowSnapshot) -> WorkflowUpdate {
        let incoming = match incoming.phase() {
            WorkflowPhase::Init => WorkflowSnapshot {
                nodes: BTreeMap::new(),
                ..incoming
            },
            _ => incoming,
        };
        let previous = self.current.clone();
        let previous_phase = previous.as_ref().map(|p| p.phase());

        if previous.as_deref() == Some(&incoming) {
            return WorkflowUpdate {
                kind: UpdateKind::Unchanged,
                phase: incoming.phase(),
                previous_phase,
                new_responses: Vec::new(),
                node_changes: Vec::new(),
                snapshot: previous.unwrap_or_else(|| Arc::new(incoming)),
                archived: false,
            };
        }

        let kind = classify(previous.as_deref(), &incoming);
        let new_responses = new_responses(previous.as_deref(), &incoming);
        let node_changes = node_changes(previous.as_deref(), &incoming);
        let snapshot = Arc::new(incoming);

        self.current = Some(Arc::clone(&snapshot));
        self.latest.update(Arc::clone(&snapshot));

        let archived = match (snapshot.phase(), &self.archive) {
            (WorkflowPhase::Finished, Some(archive)) => archive.record(&snapshot),
            _ => false,
        };

        if previous_phase != Some(snapshot.phase()) {
            tracing::info!(
                from = previous_phase.map(WorkflowPhase::as_str),
                to = %snapshot.phase(),
                nodes = snapshot.node_count(),
                archived,
                "Workflow phase changed",
            );
        }
        for change in &node_changes {
            tracing::debug!(
                node = %change.name,
                from = change.previous.map(DisplayStatus::as_str),
                to = %change.current,
                "Node status changed",
            );
        }

        let update = WorkflowUpdate {
            kind,
            phase: snapshot.phase(),
            previous_phase,
            new_responses,
            node_changes,
            snapshot,
            archived,
        };
        // No subscribers is fine.
        let _ = self.update_tx.send(update.clone());
        update
    }
}

// ---- private helpers ----

fn classify(previous: Option<&WorkflowSnapshot>, incoming: &WorkflowSnapshot) -> UpdateKind {
    if incoming.phase() == WorkflowPhase::Init {
        return UpdateKind::Reset;
    }
    match previous {
        Some(prev)
            if prev.phase() == incoming.phase()
                && prev.nodes == incoming.nodes
                && prev.extra == incoming.extra
                && extends(&prev.responses, &incoming.responses) =>
        {
            UpdateKind::Append
        }
        _ => UpdateKind::Replace,
    }
}

/// Whether `next` is `prev` plus at least one appended element.
fn extends(prev: &[String], next: &[String]) -> bool {
    next.len() > prev.len() && next.starts_with(prev)
}

fn new_responses(previous: Option<&WorkflowSnapshot>, incoming: &WorkflowSnapshot) -> Vec<String> {
    match previous {
        Some(prev) if incoming.responses.starts_with(&prev.responses) => {
            incoming.responses[prev.responses.len()..].to_vec()
        }
        _ => incoming.responses.clone(),
    }
}

fn node_changes(previous: Option<&WorkflowSnapshot>, incoming: &WorkflowSnapshot) -> Vec<NodeChange> {
    incoming
        .nodes
        .iter()
        .filter_map(|(name, record)| {
            let current = DisplayStatus::from_raw(&record.status);
            let previous = previous
                .and_then(|prev| prev.nodes.get(name))
                .map(|r| DisplayStatus::from_raw(&r.status));
            (previous != Some(current)).then(|| NodeChange {
                name: name.clone(),
                previous,
                current,
            })
        })
        .collect()
}
