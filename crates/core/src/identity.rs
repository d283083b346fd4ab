//! Persisted app identity.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// User and session identifiers issued by the backend.
///
/// Stored as one JSON record.  `session_id` is absent until a session
/// has been created for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub app_name: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AppIdentity {
    /// The session id, or [`CoreError::SessionNotInitialized`] when no
    /// session has been created yet.
    pub fn require_session(&self) -> Result<&str, CoreError> {
        self.session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(CoreError::SessionNotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn identity(session_id: Option<&str>) -> AppIdentity {
        AppIdentity {
            app_name: "flowdeck".into(),
            user_id: "u-1".into(),
            session_id: session_id.map(String::from),
        }
    }

    #[test]
    fn require_session_returns_id() {
        assert_eq!(identity(Some("s-1")).require_session().unwrap(), "s-1");
    }

    #[test]
    fn require_session_rejects_missing_or_empty() {
        assert_matches!(identity(None).require_session(), Err(CoreError::SessionNotInitialized));
        assert_matches!(identity(Some("")).require_session(), Err(CoreError::SessionNotInitialized));
    }

    #[test]
    fn missing_session_deserializes_as_none() {
        let parsed: AppIdentity =
            serde_json::from_str(r#"{"app_name":"a","user_id":"u"}"#).unwrap();
        assert!(parsed.session_id.is_none());
    }
}
