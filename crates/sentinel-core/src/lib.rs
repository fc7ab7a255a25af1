pub mod config;
pub mod error;
pub mod types;
pub mod worker;

pub use config::SentinelConfig;
pub use error::{Result, SentinelError};
pub use types::{ChatId, Identity, MessageId, TenantId};
pub use worker::WorkerPool;
