//! Snapshot normalizer.
//!
//! Converts an untyped backend payload into a well-formed
//! [`WorkflowSnapshot`].  Normalization never fails: absent, null, or
//! wrongly-typed fields are replaced with safe defaults so that nothing
//! downstream has to re-check the payload shape.
//!
//! The backend has emitted both PascalCase (`WorkflowState`, `Nodes`)
//! and camelCase (`workflowState`, `nodes`) keys over time; both are
//! accepted, and the camelCase spelling wins when a payload carries both.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::snapshot::{NodeRecord, WorkflowPhase, WorkflowSnapshot};

/// Status given to nodes whose status is missing or invalid.
pub const DEFAULT_NODE_STATUS: &str = "waiting";

/// Message for nodes whose whole record is missing, empty, or not an object.
pub const PLACEHOLDER_NODE_MESSAGE: &str = "Waiting to be processed";

/// Message for otherwise-valid nodes that carry no message.
pub const MISSING_NODE_MESSAGE: &str = "No message available";

const STATE_KEYS: &[&str] = &["workflowState", "WorkflowState"];
const NODES_KEYS: &[&str] = &["nodes", "Nodes"];
const RESPONSES_KEYS: &[&str] = &["responses", "Responses"];

const NODE_STATUS_KEY: &str = "status";
const NODE_TIMESTAMP_KEY: &str = "timestamp";
const NODE_MESSAGE_KEY: &str = "message";

/// Normalize a raw backend payload.
///
/// * Non-object payloads (including `null`) yield
///   [`WorkflowSnapshot::error`].
/// * A missing or non-string `workflowState` yields the `Error` phase.
/// * `nodes` that is missing or not an object yields an empty node map.
/// * `responses` that is missing or not an array yields no responses.
/// * Unknown top-level fields are preserved in `extra`.
pub fn normalize(raw: &Value) -> WorkflowSnapshot {
    let Some(object) = raw.as_object() else {
        return WorkflowSnapshot::error();
    };

    let workflow_state = lookup(object, STATE_KEYS)
        .and_then(Value::as_str)
        .map(WorkflowPhase::parse)
        .unwrap_or(WorkflowPhase::Error);

    let nodes = lookup(object, NODES_KEYS)
        .and_then(Value::as_object)
        .map(normalize_nodes)
        .unwrap_or_default();

    let responses = lookup(object, RESPONSES_KEYS)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(response_text).collect())
        .unwrap_or_default();

    let extra = object
        .iter()
        .filter(|(key, _)| !is_known_top_level_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    WorkflowSnapshot {
        workflow_state,
        nodes,
        responses,
        extra,
    }
}

/// Normalize a single node entry.
///
/// Missing, non-object, and empty-object entries become a placeholder
/// record.  Otherwise only the missing or invalid sub-fields are filled
/// in and every other field is kept as-is.
pub fn normalize_node(raw: &Value) -> NodeRecord {
    let fields = match raw.as_object() {
        Some(fields) if !fields.is_empty() => fields,
        _ => return NodeRecord::new(DEFAULT_NODE_STATUS, 0.0, PLACEHOLDER_NODE_MESSAGE),
    };

    let status = fields
        .get(NODE_STATUS_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_NODE_STATUS);

    let timestamp = fields
        .get(NODE_TIMESTAMP_KEY)
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite())
        .unwrap_or(0.0);

    let message = fields
        .get(NODE_MESSAGE_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(MISSING_NODE_MESSAGE);

    let mut record = NodeRecord::new(status, timestamp, message);
    record.extra = fields
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                NODE_STATUS_KEY | NODE_TIMESTAMP_KEY | NODE_MESSAGE_KEY
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    record
}

// ---- private helpers ----

fn normalize_nodes(raw: &Map<String, Value>) -> BTreeMap<String, NodeRecord> {
    raw.iter()
        .map(|(name, value)| (name.clone(), normalize_node(value)))
        .collect()
}

/// Return the first present key from `keys`, treating `null` as absent.
fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn is_known_top_level_key(key: &str) -> bool {
    STATE_KEYS.contains(&key) || NODES_KEYS.contains(&key) || RESPONSES_KEYS.contains(&key)
}

/// Response fragments are strings; anything else is kept as its JSON
/// text so the fragment count still matches the backend's array.
fn response_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
