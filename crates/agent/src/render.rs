//! Plain-text rendering of workflow state for the terminal.

use flowdeck_client::{Agent, Tool};
use flowdeck_core::node_status::{ordered_nodes, DisplayStatus};
use flowdeck_core::WorkflowSnapshot;
use flowdeck_sync::{UpdateKind, WorkflowHistoryRecord, WorkflowUpdate};

/// Width reserved for the status column and padding.
const STATUS_COLUMN: usize = 14;

/// Panel pixels per terminal column.
pub const PIXELS_PER_COLUMN: u32 = 8;

/// Terminal columns for a panel width stored in pixels.
pub fn panel_columns(width_px: u32) -> usize {
    (width_px / PIXELS_PER_COLUMN) as usize
}

/// Active nodes in execution order, one per line, with messages cut to
/// fit `columns` terminal columns.
pub fn render_nodes(snapshot: &WorkflowSnapshot, columns: usize) -> String {
    let nodes = ordered_nodes(snapshot);
    let pending = snapshot.node_count() - nodes.len();
    let message_width = columns.saturating_sub(STATUS_COLUMN).max(8);

    let mut out = format!("workflow: {}\n", snapshot.phase());
    for node in &nodes {
        let line = format!("{}  {}", node.name, node.message);
        out.push_str(&format!(
            "  {:<10} {}  {}\n",
            format!("[{}]", node.status),
            progress_bar(node.status),
            truncate(&line, message_width),
        ));
    }
    if pending > 0 {
        out.push_str(&format!("  ({pending} waiting to start)\n"));
    }
    out
}

/// Log-style lines describing an update; empty for no-op updates.
pub fn render_update(update: &WorkflowUpdate) -> Vec<String> {
    if update.kind == UpdateKind::Unchanged {
        return Vec::new();
    }

    let mut lines = Vec::new();
    if update.is_transition() {
        let line = match update.kind {
            UpdateKind::Reset => "-- new run started".to_string(),
            _ => format!("-- workflow {}", update.phase),
        };
        lines.push(line);
    }
    for change in &update.node_changes {
        lines.push(format!("   {} -> {}", change.name, change.current));
    }
    if update.archived {
        lines.push("-- run saved to history".to_string());
    }
    lines
}

/// Numbered summary of archived runs.
pub fn render_history(records: &[WorkflowHistoryRecord]) -> String {
    if records.is_empty() {
        return "no archived runs\n".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            format!(
                "{:>3}  {}  {} nodes, {} responses\n",
                i + 1,
                record.timestamp,
                record.snapshot.node_count(),
                record.snapshot.responses.len(),
            )
        })
        .collect()
}

/// One line per agent: name, type, and description.
pub fn render_agents(agents: &[&Agent]) -> String {
    if agents.is_empty() {
        return "no agents\n".to_string();
    }
    agents
        .iter()
        .map(|a| format!("{:<16} {:<12} {}\n", a.id, format!("[{}]", a.kind), a.name))
        .collect()
}

/// One line per tool: id, category, and name.
pub fn render_tools(tools: &[&Tool]) -> String {
    if tools.is_empty() {
        return "no tools\n".to_string();
    }
    tools
        .iter()
        .map(|t| format!("{:<16} {:<12} {}\n", t.id, format!("[{}]", t.category), t.name))
        .collect()
}

fn progress_bar(status: DisplayStatus) -> String {
    const CELLS: usize = 5;
    let filled = (status.progress() * CELLS as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(CELLS - filled))
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use flowdeck_core::{normalize, WorkflowPhase};
    use flowdeck_sync::NodeChange;
    use serde_json::json;

    use super::*;

    fn snapshot() -> WorkflowSnapshot {
        normalize(&json!({
            "workflowState": "Running",
            "nodes": {
                "writer": { "status": "running", "timestamp": 20, "message": "drafting the answer" },
                "planner": { "status": "finished", "timestamp": 10, "message": "planned" },
                "reviewer": {},
            },
        }))
    }

    #[test]
    fn nodes_render_in_execution_order() {
        let text = render_nodes(&snapshot(), panel_columns(300));
        let planner = text.find("planner").unwrap();
        let writer = text.find("writer").unwrap();
        assert!(planner < writer);
        assert!(text.contains("[completed] #####"));
        assert!(text.contains("[running]"));
        assert!(text.contains("(1 waiting to start)"));
        assert!(!text.contains("reviewer"));
    }

    #[test]
    fn narrow_width_truncates_messages() {
        let text = render_nodes(&snapshot(), 24);
        assert!(text.contains('…'));
        assert!(!text.contains("drafting the answer"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 6), "héllo…");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn update_lines_describe_transitions_and_changes() {
        let update = WorkflowUpdate {
            kind: UpdateKind::Replace,
            phase: WorkflowPhase::Finished,
            previous_phase: Some(WorkflowPhase::Running),
            new_responses: vec![],
            node_changes: vec![NodeChange {
                name: "writer".into(),
                previous: Some(DisplayStatus::Running),
                current: DisplayStatus::Completed,
            }],
            snapshot: Arc::new(WorkflowSnapshot::empty(WorkflowPhase::Finished)),
            archived: true,
        };
        assert_eq!(
            render_update(&update),
            [
                "-- workflow Finished",
                "   writer -> completed",
                "-- run saved to history",
            ]
        );
    }

    #[test]
    fn default_panel_width_maps_to_columns() {
        assert_eq!(panel_columns(300), 37);
        assert_eq!(panel_columns(4), 0);
        // Too narrow a panel still leaves room for a cut message.
        assert!(render_nodes(&snapshot(), panel_columns(4)).contains('…'));
    }

    #[test]
    fn catalogs_list_one_entry_per_line() {
        let tool = Tool {
            id: "search".into(),
            name: "Web Search".into(),
            category: "retrieval".into(),
            ..Default::default()
        };
        assert_eq!(render_tools(&[&tool]), "search           [retrieval]  Web Search\n");
        assert_eq!(render_agents(&[]), "no agents\n");
    }

    #[test]
    fn empty_history_has_placeholder() {
        assert_eq!(render_history(&[]), "no archived runs\n");
    }
}
