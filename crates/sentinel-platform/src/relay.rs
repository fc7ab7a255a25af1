//! Re-sending a received message into another chat.

use sentinel_core::types::{ChatId, MessageId};

use crate::client::PlatformClient;
use crate::error::Result;
use crate::types::{MessageContent, MessageEvent, OutboundMedia, OutboundText};

/// Send a copy of `msg` to `chat`.
///
/// Media with a platform locator is re-sent as media (caption kept); anything
/// else falls back to its text or caption. Returns `None` when nothing in the
/// message can be copied, e.g. a sticker the bridge forwarded without a locator.
pub async fn repost(
    client: &dyn PlatformClient,
    chat: &ChatId,
    msg: &MessageEvent,
) -> Result<Option<MessageId>> {
    let caption = msg.content.text().filter(|t| !t.is_empty());

    if let (Some(kind), Some(media)) = (msg.content.media_kind(), msg.media.as_ref()) {
        let file_name = match &msg.content {
            MessageContent::Document { file_name, .. } => file_name.clone(),
            _ => None,
        };
        let out = OutboundMedia {
            kind,
            upload: media.upload.clone(),
            mime_type: media.mime_type.clone(),
            caption: caption.map(str::to_string),
            file_name,
            quoted: None,
        };
        return client.send_media(chat, &out).await.map(Some);
    }

    match caption {
        Some(text) => client.send_text(chat, &OutboundText::new(text)).await.map(Some),
        None => Ok(None),
    }
}
