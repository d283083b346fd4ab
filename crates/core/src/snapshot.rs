//! Workflow snapshot model.
//!
//! A [`WorkflowSnapshot`] is one point-in-time capture of the backend's
//! workflow state: the lifecycle phase, the named node records, and the
//! ordered response fragments produced so far.  Snapshots only ever
//! reach the rest of the system through
//! [`normalize`](crate::normalize::normalize), so every field is present
//! and well-typed.
//!
//! Serialization uses the canonical camelCase keys (`workflowState`,
//! `nodes`, `responses`).  Fields the backend sends that this model does
//! not know about are kept in `extra` and written back verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::types::UnixSeconds;

// ---------------------------------------------------------------------------
// Lifecycle phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a workflow run, as reported by `workflowState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowPhase {
    Init,
    Running,
    Finished,
    /// Also used for any value the backend sends that is not one of the
    /// three known phases.
    Error,
}

impl WorkflowPhase {
    /// Map a raw `workflowState` string to a phase.
    ///
    /// Matching ignores ASCII case; unrecognised values become
    /// [`WorkflowPhase::Error`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("init") {
            Self::Init
        } else if raw.eq_ignore_ascii_case("running") {
            Self::Running
        } else if raw.eq_ignore_ascii_case("finished") {
            Self::Finished
        } else {
            Self::Error
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Running => "Running",
            Self::Finished => "Finished",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Node record
// ---------------------------------------------------------------------------

/// Backend record for a single workflow node.
///
/// `status` is the raw backend string; map it through
/// [`DisplayStatus::from_raw`](crate::node_status::DisplayStatus::from_raw)
/// before making decisions on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub status: String,
    /// Unix seconds; `0` means the node has not started.
    #[serde(serialize_with = "serialize_unix_seconds")]
    pub timestamp: UnixSeconds,
    pub message: String,
    /// Any other backend-supplied fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeRecord {
    pub fn new(
        status: impl Into<String>,
        timestamp: UnixSeconds,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            timestamp,
            message: message.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether the node has a non-zero start timestamp.
    pub fn has_started(&self) -> bool {
        self.timestamp != 0.0
    }
}

/// Write whole-second timestamps as integers so that a payload such as
/// `{"timestamp": 1700000000}` serializes back to the same JSON.
fn serialize_unix_seconds<S: Serializer>(
    value: &UnixSeconds,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A normalized point-in-time capture of workflow state.
///
/// Equality is deep: two snapshots are equal when their phase, every
/// node record, every response fragment, and every preserved extra field
/// match.  The history archive relies on this for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub workflow_state: WorkflowPhase,
    pub nodes: BTreeMap<String, NodeRecord>,
    pub responses: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowSnapshot {
    /// An empty snapshot in the given phase.
    pub fn empty(phase: WorkflowPhase) -> Self {
        Self {
            workflow_state: phase,
            nodes: BTreeMap::new(),
            responses: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// The snapshot substituted for an absent or non-object payload.
    pub fn error() -> Self {
        Self::empty(WorkflowPhase::Error)
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.workflow_state
    }

    /// Number of nodes, including ones that have not started yet.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }
}
