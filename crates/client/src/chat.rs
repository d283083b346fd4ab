//! Chat session: transcript plus the message-send paths.
//!
//! A send requires a resolved session id; without one it fails with
//! [`ChatError::SessionNotInitialized`] and nothing is appended.  On a
//! transport failure the user's message stays in the transcript and the
//! error is handed back for an inline notice.

use std::sync::Arc;

use flowdeck_core::identity::AppIdentity;
use flowdeck_core::transcript::ChatMessage;
use flowdeck_store::KvStore;
use flowdeck_sync::LatestWorkflowData;
use tokio::task::JoinHandle;

use crate::api::{AgentBackend, ApiError, ChatReply};
use crate::identity::IdentityManager;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Session not initialized: resolve identity before sending messages")]
    SessionNotInitialized,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One user's conversation with the agent.
pub struct ChatSession {
    backend: Arc<dyn AgentBackend>,
    identity: IdentityManager,
    latest: LatestWorkflowData,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn KvStore>,
        latest: LatestWorkflowData,
    ) -> Self {
        Self {
            identity: IdentityManager::new(Arc::clone(&backend), store),
            backend,
            latest,
            transcript: Vec::new(),
        }
    }

    pub fn identity(&self) -> &IdentityManager {
        &self.identity
    }

    /// Messages exchanged so far, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send `text` and wait for the agent's reply.
    ///
    /// Returns the appended agent message.
    pub async fn send(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        let (user_id, session_id) = self.prepare_send(text)?;

        match self.backend.send_message(text, &user_id, &session_id).await {
            Ok(reply) => {
                self.transcript.push(ChatMessage::agent(reply.text()));
                Ok(&self.transcript[self.transcript.len() - 1])
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "Chat send failed");
                Err(e.into())
            }
        }
    }

    /// Send `text` without waiting for the reply.
    ///
    /// The user message is appended immediately.  The agent's output is
    /// expected through the response stream and added with
    /// [`push_agent_message`](Self::push_agent_message).
    pub fn send_async(
        &mut self,
        text: &str,
    ) -> Result<JoinHandle<Result<ChatReply, ApiError>>, ChatError> {
        let (user_id, session_id) = self.prepare_send(text)?;
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();

        Ok(tokio::spawn(async move {
            let result = backend.send_message(&text, &user_id, &session_id).await;
            if let Err(e) = &result {
                tracing::warn!(%session_id, error = %e, "Background chat send failed");
            }
            result
        }))
    }

    /// Append an agent message that arrived outside [`send`](Self::send).
    pub fn push_agent_message(&mut self, content: impl Into<String>) {
        self.transcript.push(ChatMessage::agent(content));
    }

    /// Start a new conversation.
    ///
    /// Renews the session id, then clears the transcript and the latest
    /// workflow data.  If renewal fails nothing is cleared.
    pub async fn reset(&mut self) -> Result<AppIdentity, ChatError> {
        let identity = self.identity.new_session().await?;
        self.transcript.clear();
        self.latest.reset();
        tracing::info!(session_id = ?identity.session_id, "Started new conversation");
        Ok(identity)
    }

    /// Validate the send preconditions and record the user message.
    fn prepare_send(&mut self, text: &str) -> Result<(String, String), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let identity = self
            .identity
            .current()
            .ok_or(ChatError::SessionNotInitialized)?;
        let session_id = identity
            .require_session()
            .map_err(|_| ChatError::SessionNotInitialized)?
            .to_string();

        self.transcript.push(ChatMessage::user(text));
        Ok((identity.user_id, session_id))
    }
}
