use thiserror::Error;

/// Errors returned by any messaging-platform client.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The transport could not be reached or the connection dropped mid-call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The platform refused the action because the bot lacks the privilege
    /// (typically: not a group administrator).
    #[error("Insufficient privilege: {0}")]
    Forbidden(String),

    /// The platform answered with a non-success status.
    #[error("Rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// An outbound call exceeded its time budget.
    #[error("Platform call timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// No client is registered, or the session is logged out.
    #[error("Tenant not connected: {0}")]
    NotConnected(String),
}

impl PlatformError {
    /// `true` when the failure means "grant the bot admin rights", as opposed
    /// to a transient or unexpected failure.
    pub fn is_privilege(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_))
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PlatformError::Timeout
        } else if e.is_decode() {
            PlatformError::Decode(e.to_string())
        } else {
            PlatformError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
