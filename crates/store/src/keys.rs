//! Storage key constants.
//!
//! Each durable record lives under exactly one of these keys.  All three
//! records are optional; readers fall back to defaults when a key is
//! absent.

/// App identity record `{ app_name, user_id, session_id }`.
pub const IDENTITY_KEY: &str = "workflow_app_config";

/// Workflow history: a single JSON array of archived runs.
pub const HISTORY_KEY: &str = "workflow_history";

/// Sidebar panel width in pixels.
pub const PANEL_WIDTH_KEY: &str = "workflow_sidebar_width";
