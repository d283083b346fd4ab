//! Polling cadences.
//!
//! The transcript sidebar polls once a second.  The graph view lets the
//! user pick from a short list of slower cadences, and programmatic
//! callers may pass any non-zero interval.

use std::time::Duration;

use crate::error::CoreError;

/// A validated, non-zero polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshInterval(Duration);

impl RefreshInterval {
    /// Sidebar / transcript cadence.
    pub const SIDEBAR: Self = Self(Duration::from_secs(1));

    /// Graph view cadence selected on first load.
    pub const GRAPH_DEFAULT: Self = Self(Duration::from_secs(5));

    /// Cadences offered by the graph view.
    pub const GRAPH_OPTIONS: [Self; 4] = [
        Self(Duration::from_secs(2)),
        Self(Duration::from_secs(5)),
        Self(Duration::from_secs(10)),
        Self(Duration::from_secs(30)),
    ];

    /// Build an interval from milliseconds, rejecting zero.
    pub fn from_millis(ms: u64) -> Result<Self, CoreError> {
        if ms == 0 {
            return Err(CoreError::Validation(
                "refresh interval must be greater than zero".into(),
            ));
        }
        Ok(Self(Duration::from_millis(ms)))
    }

    pub fn duration(self) -> Duration {
        self.0
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::SIDEBAR
    }
}

impl From<RefreshInterval> for Duration {
    fn from(interval: RefreshInterval) -> Self {
        interval.0
    }
}
