#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Session not initialized: resolve identity before sending messages")]
    SessionNotInitialized,
}
