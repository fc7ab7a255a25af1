pub mod bridge;
pub mod card;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;
pub mod registry;
pub mod relay;
pub mod types;

pub use bridge::{BridgeClient, BridgePairing, Timeouts};
pub use card::Card;
pub use client::{PairingProvider, PlatformClient};
pub use error::PlatformError;
pub use registry::TenantRegistry;
pub use relay::repost;
pub use types::{
    ConnectionEvent, ConnectionState, ConnectionStatus, GroupEvent, GroupInfo, InboundEvent,
    MediaKind, MediaRef, MessageContent, MessageEvent, OutboundMedia, OutboundText, Participant,
    ParticipantChange, Presence, QuotedMessage, UploadedMedia,
};
