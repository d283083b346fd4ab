//! Client configuration loaded from environment variables.

use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default per-call timeout for state fetches.
pub const DEFAULT_STATE_TIMEOUT_SECS: u64 = 10;

/// Default per-call timeout for synchronous chat calls.  Generous,
/// because the backend answers only after the agent has finished.
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    /// Timeout applied to every state fetch.
    pub state_timeout: Duration,
    /// Timeout applied to synchronous chat calls.
    pub chat_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_timeout: Duration::from_secs(DEFAULT_STATE_TIMEOUT_SECS),
            chat_timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `FLOWDECK_API_URL`            | `http://localhost:8000` |
    /// | `FLOWDECK_STATE_TIMEOUT_SECS` | `10`                    |
    /// | `FLOWDECK_CHAT_TIMEOUT_SECS`  | `120`                   |
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        let api_url = std::env::var("FLOWDECK_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.into());

        Self {
            api_url,
            state_timeout: secs_from_env("FLOWDECK_STATE_TIMEOUT_SECS", DEFAULT_STATE_TIMEOUT_SECS),
            chat_timeout: secs_from_env("FLOWDECK_CHAT_TIMEOUT_SECS", DEFAULT_CHAT_TIMEOUT_SECS),
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
