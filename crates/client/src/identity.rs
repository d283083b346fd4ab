//! Identity setup and session renewal.
//!
//! The backend issues a user id and, per logical conversation, a
//! session id.  Both are persisted under
//! [`IDENTITY_KEY`](flowdeck_store::keys::IDENTITY_KEY) so a restart
//! resumes the same conversation; starting a new conversation renews
//! only the session id.

use std::sync::Arc;

use flowdeck_core::identity::AppIdentity;
use flowdeck_store::keys::IDENTITY_KEY;
use flowdeck_store::{load_json, remove_key, save_json, KvStore};

use crate::api::{AgentBackend, ApiError};

/// Resolves, renews, and forgets the persisted [`AppIdentity`].
pub struct IdentityManager {
    backend: Arc<dyn AgentBackend>,
    store: Arc<dyn KvStore>,
}

impl IdentityManager {
    pub fn new(backend: Arc<dyn AgentBackend>, store: Arc<dyn KvStore>) -> Self {
        Self { backend, store }
    }

    /// The stored identity, if any.
    pub fn current(&self) -> Option<AppIdentity> {
        load_json(self.store.as_ref(), IDENTITY_KEY)
    }

    /// Reuse the stored identity, obtaining whatever part is missing.
    ///
    /// A stored user without a session gets a new session; no stored
    /// identity at all requests a fresh user first.
    pub async fn initialize(&self) -> Result<AppIdentity, ApiError> {
        match self.current() {
            Some(identity) if identity.require_session().is_ok() => {
                tracing::debug!(user_id = %identity.user_id, "Reusing stored identity");
                Ok(identity)
            }
            Some(identity) => self.open_session(identity).await,
            None => {
                let user = self.backend.generate_user().await?;
                tracing::info!(user_id = %user.user_id, "Obtained new user identity");
                self.open_session(AppIdentity {
                    app_name: user.app_name,
                    user_id: user.user_id,
                    session_id: None,
                })
                .await
            }
        }
    }

    /// Start a new logical conversation.
    ///
    /// Keeps the stored user id and replaces the session id.  With no
    /// stored identity this is a full [`initialize`](Self::initialize).
    pub async fn new_session(&self) -> Result<AppIdentity, ApiError> {
        match self.current() {
            Some(identity) => self.open_session(identity).await,
            None => self.initialize().await,
        }
    }

    /// Forget the stored identity.  The next
    /// [`initialize`](Self::initialize) requests a fresh user.
    pub fn clear(&self) {
        remove_key(self.store.as_ref(), IDENTITY_KEY);
    }

    async fn open_session(&self, mut identity: AppIdentity) -> Result<AppIdentity, ApiError> {
        let grant = self.backend.create_session(&identity.user_id).await?;
        tracing::info!(
            user_id = %identity.user_id,
            session_id = %grant.session_id,
            "Opened backend session",
        );
        identity.session_id = Some(grant.session_id);
        save_json(self.store.as_ref(), IDENTITY_KEY, &identity);
        Ok(identity)
    }
}
