use thiserror::Error;

/// Process-level errors. Component crates keep their own enums and convert
/// into this one only where a failure has to leave the component, which in
/// practice means startup and the HTTP control plane.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unknown tenant: {0}")]
    UnknownTenant(String),

    /// A dependency outside the process (bridge, catalog) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl SentinelError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            SentinelError::Config(_) => "CONFIG_ERROR",
            SentinelError::InvalidInput(_) => "INVALID_INPUT",
            SentinelError::Unauthorized(_) => "UNAUTHORIZED",
            SentinelError::UnknownTenant(_) => "UNKNOWN_TENANT",
            SentinelError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
