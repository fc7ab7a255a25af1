use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session under this key (never created, finished, or expired).
    #[error("session not found: {key}")]
    NotFound { key: String },

    /// The session belongs to another tenant's key space.
    #[error("session {key} is bound to tenant {expected}")]
    TenantMismatch { key: String, expected: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
