//! Display-side view of workflow nodes.
//!
//! The backend reports node status as a free-form string.  Consumers
//! never branch on that string directly; they map it to the closed
//! [`DisplayStatus`] set first.

use serde::Serialize;

use crate::snapshot::{NodeRecord, WorkflowSnapshot};
use crate::types::UnixSeconds;

/// Closed set of statuses a node can be displayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Running,
    Completed,
    Waiting,
    Error,
}

impl DisplayStatus {
    /// Map a raw backend status to its display status.
    ///
    /// `"finished"` (and the already-mapped `"completed"`) display as
    /// completed; unknown values display as waiting.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "finished" | "completed" => Self::Completed,
            "running" => Self::Running,
            "error" => Self::Error,
            _ => Self::Waiting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Waiting => "waiting",
            Self::Error => "error",
        }
    }

    /// Fill fraction of a node's progress bar in the graph view.
    pub fn progress(self) -> f64 {
        match self {
            Self::Completed => 1.0,
            Self::Running => 0.6,
            Self::Waiting | Self::Error => 0.0,
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node ready for display, keyed by its unique name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedNode {
    pub name: String,
    pub status: DisplayStatus,
    pub message: String,
    pub timestamp: UnixSeconds,
}

impl NormalizedNode {
    pub fn from_record(name: &str, record: &NodeRecord) -> Self {
        Self {
            name: name.to_string(),
            status: DisplayStatus::from_raw(&record.status),
            message: record.message.clone(),
            timestamp: record.timestamp,
        }
    }

    pub fn has_started(&self) -> bool {
        self.timestamp != 0.0
    }
}

/// Every node in the snapshot, in name order.
pub fn all_nodes(snapshot: &WorkflowSnapshot) -> Vec<NormalizedNode> {
    snapshot
        .nodes
        .iter()
        .map(|(name, record)| NormalizedNode::from_record(name, record))
        .collect()
}

/// Nodes in active-execution order: ascending timestamp, ties broken by
/// name.  Nodes that have not started (`timestamp == 0`) are left out.
pub fn ordered_nodes(snapshot: &WorkflowSnapshot) -> Vec<NormalizedNode> {
    let mut nodes: Vec<NormalizedNode> = all_nodes(snapshot)
        .into_iter()
        .filter(NormalizedNode::has_started)
        .collect();
    nodes.sort_by(|a, b| {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then_with(|| a.name.cmp(&b.name))
    });
    nodes
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn raw_status_mapping() {
        assert_eq!(DisplayStatus::from_raw("finished"), DisplayStatus::Completed);
        assert_eq!(DisplayStatus::from_raw("completed"), DisplayStatus::Completed);
        assert_eq!(DisplayStatus::from_raw("running"), DisplayStatus::Running);
        assert_eq!(DisplayStatus::from_raw("error"), DisplayStatus::Error);
        assert_eq!(DisplayStatus::from_raw("waiting"), DisplayStatus::Waiting);
        assert_eq!(DisplayStatus::from_raw("queued"), DisplayStatus::Waiting);
        assert_eq!(DisplayStatus::from_raw("RUNNING"), DisplayStatus::Waiting);
    }

    #[test]
    fn progress_fractions() {
        assert_eq!(DisplayStatus::Completed.progress(), 1.0);
        assert_eq!(DisplayStatus::Running.progress(), 0.6);
        assert_eq!(DisplayStatus::Waiting.progress(), 0.0);
        assert_eq!(DisplayStatus::Error.progress(), 0.0);
    }

    #[test]
    fn display_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(DisplayStatus::Completed).unwrap(), "completed");
    }

    #[test]
    fn ordered_nodes_sorts_by_timestamp_and_skips_unstarted() {
        let snapshot = normalize(&json!({
            "workflowState": "Running",
            "nodes": {
                "writer": { "status": "running", "timestamp": 30, "message": "drafting" },
                "planner": { "status": "finished", "timestamp": 10, "message": "planned" },
                "reviewer": {},
                "researcher": { "status": "finished", "timestamp": 20, "message": "found" },
            },
        }));

        let ordered = ordered_nodes(&snapshot);
        let names: Vec<&str> = ordered.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["planner", "researcher", "writer"]);
        assert_eq!(ordered[0].status, DisplayStatus::Completed);

        // The unstarted node still exists for existence checks.
        assert_eq!(snapshot.node_count(), 4);
        assert!(snapshot.contains_node("reviewer"));
    }

    #[test]
    fn ordered_nodes_breaks_ties_by_name() {
        let snapshot = normalize(&json!({
            "workflowState": "Running",
            "nodes": {
                "b": { "status": "running", "timestamp": 5, "message": "" },
                "a": { "status": "running", "timestamp": 5, "message": "" },
            },
        }));
        let names: Vec<String> = ordered_nodes(&snapshot).into_iter().map(|n| n.name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn all_nodes_includes_unstarted() {
        let snapshot = normalize(&json!({
            "workflowState": "Running",
            "nodes": { "planner": {} },
        }));
        let nodes = all_nodes(&snapshot);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].status, DisplayStatus::Waiting);
        assert!(!nodes[0].has_started());
    }
}
