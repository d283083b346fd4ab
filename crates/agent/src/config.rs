//! Agent configuration loaded from environment variables.

use std::path::PathBuf;

use flowdeck_client::ClientConfig;
use flowdeck_core::refresh::RefreshInterval;

/// Default directory for durable client state.
pub const DEFAULT_DATA_DIR: &str = "./.flowdeck";

/// Everything the terminal client needs at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub client: ClientConfig,
    /// Cadence of the live monitor while following a run.
    pub poll_interval: RefreshInterval,
    /// Where identity, history, and preferences are stored.
    pub data_dir: PathBuf,
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default        |
    /// |-----------------------------|----------------|
    /// | `FLOWDECK_POLL_INTERVAL_MS` | `1000`         |
    /// | `FLOWDECK_DATA_DIR`         | `./.flowdeck`  |
    ///
    /// Backend settings come from [`ClientConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            client: ClientConfig::from_env(),
            poll_interval: parse_poll_interval(
                std::env::var("FLOWDECK_POLL_INTERVAL_MS").ok().as_deref(),
            ),
            data_dir: std::env::var("FLOWDECK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }
}

/// Parse a millisecond interval, falling back to the sidebar cadence
/// for missing, unparseable, or zero values.
pub fn parse_poll_interval(raw: Option<&str>) -> RefreshInterval {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .and_then(|ms| RefreshInterval::from_millis(ms).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn poll_interval_parses_milliseconds() {
        assert_eq!(
            parse_poll_interval(Some("2500")).duration(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn poll_interval_falls_back_to_sidebar_cadence() {
        for raw in [None, Some(""), Some("fast"), Some("0"), Some("-5")] {
            assert_eq!(parse_poll_interval(raw), RefreshInterval::SIDEBAR, "{raw:?}");
        }
    }
}
