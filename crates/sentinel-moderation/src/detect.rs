use sentinel_platform::{MediaKind, MessageContent};
use sentinel_settings::{ChatSettings, Feature};

/// Case-insensitive substrings that mark a message as containing a link.
pub const LINK_MARKERS: &[&str] = &[
    "http://",
    "https://",
    "www.",
    "chat.whatsapp.com/",
    "t.me/",
    "youtube.com/",
    "youtu.be/",
    "instagram.com/",
    "fb.com/",
    "facebook.com/",
    "twitter.com/",
    "x.com/",
];

pub fn contains_link(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    LINK_MARKERS.iter().any(|m| lower.contains(m))
}

/// First enabled rule the content violates, in priority order
/// link → image → video → sticker. At most one violation per message.
pub fn detect_violation(settings: &ChatSettings, content: &MessageContent) -> Option<Feature> {
    Feature::ALL
        .into_iter()
        .filter(|f| settings.rule(*f).enabled)
        .find(|f| violates(*f, content))
}

fn violates(feature: Feature, content: &MessageContent) -> bool {
    match feature {
        Feature::Link => content.text().is_some_and(contains_link),
        Feature::Image => content.media_kind() == Some(MediaKind::Image),
        Feature::Video => content.media_kind() == Some(MediaKind::Video),
        Feature::Sticker => content.media_kind() == Some(MediaKind::Sticker),
    }
}
