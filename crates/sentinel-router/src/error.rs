use sentinel_platform::card::{error_card, Card};
use sentinel_platform::PlatformError;
use sentinel_sessions::SessionError;
use thiserror::Error;

/// Failure of one command handler. Never leaves the router: every variant
/// maps to a reply card.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Wrong or missing arguments; the payload is the full usage line.
    #[error("usage: {0}")]
    Usage(String),

    #[error("platform call failed: {0}")]
    Platform(#[from] PlatformError),

    /// A dependency failed; the payload is the text shown to the user.
    #[error("{0}")]
    Unavailable(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl CommandError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        CommandError::Unavailable(message.into())
    }

    /// The reply card for this failure.
    pub fn card(&self) -> Card {
        match self {
            CommandError::Usage(usage) => Card::new("INVALID FORMAT")
                .line("📝 Usage:")
                .line(usage),
            CommandError::Platform(e) if e.is_privilege() => error_card("Bot needs admin"),
            CommandError::Platform(PlatformError::Timeout) => {
                error_card("Platform did not respond, try again later")
            }
            CommandError::Platform(_) => error_card("Action failed, try again later"),
            CommandError::Unavailable(message) => error_card(message),
            CommandError::Session(_) => error_card("Could not open the menu, try again"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;
