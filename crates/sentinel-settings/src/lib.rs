pub mod backend;
pub mod error;
pub mod store;
pub mod types;

pub use backend::{init_db, MemoryBackend, SettingsBackend, SqliteBackend};
pub use error::{Result, SettingsError};
pub use store::SettingsStore;
pub use types::{ChatMode, ChatSettings, EnforcementAction, Feature, Rule, TenantSettings};
