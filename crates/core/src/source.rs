//! The point-in-time state fetch collaborator.
//!
//! The synchronization engine only needs one thing from the backend: a
//! raw, untyped snapshot payload.  [`StateSource`] is that seam; the HTTP
//! client implements it and tests substitute scripted fakes.

use std::time::Duration;

use async_trait::async_trait;

/// Fetches the backend's current workflow state as raw JSON.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch_state(&self) -> Result<serde_json::Value, SourceError>;
}

/// Transport-level failure of a state fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The request did not complete within its per-call timeout.
    #[error("State request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("State endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Network, DNS, TLS, or any other transport failure.
    #[error("State request failed: {0}")]
    Transport(String),
}
