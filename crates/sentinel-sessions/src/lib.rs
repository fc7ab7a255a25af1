pub mod error;
pub mod manager;
pub mod recent;
pub mod registry;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::{spawn_sweeper, SessionManager};
pub use recent::{RecentMessages, STATUS_DEPTH};
pub use registry::Registry;
pub use types::{MenuKind, MenuOption, PendingSelection, Selected, SessionKey, SetupSession, WizardStage};
