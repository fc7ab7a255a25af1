use thiserror::Error;

/// Errors raised by settings backends. The cache itself never fails a read;
/// these only surface from preload and from persistence writes.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is unusable (e.g. its lock holder panicked mid-write).
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;
