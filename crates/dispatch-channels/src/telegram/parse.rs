//! Conversion of Telegram messages into channel-agnostic inbound events.

use super::types::TgMessage;
use dispatch_core::event::{EventKind, InboundEvent, MediaAttachment, MediaType};
use tracing::{debug, warn};

pub(crate) const CHANNEL_NAME: &str = "telegram";

/// Convert a message into an [`InboundEvent`], or `None` when it must be
/// ignored (unknown sender, group chat, unsupported content).
pub(crate) fn to_event(msg: TgMessage, allowed_users: &[i64]) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;

    if !allowed_users.is_empty() && !allowed_users.contains(&user.id) {
        warn!("ignoring message from unauthorized user {}", user.id);
        return None;
    }

    // Dialogues are one-to-one.
    if matches!(msg.chat.chat_type.as_str(), "group" | "supergroup") {
        debug!("telegram: ignoring group message from chat {}", msg.chat.id);
        return None;
    }

    let sender_name = if let Some(ref un) = user.username {
        format!("@{un}")
    } else if let Some(ref ln) = user.last_name {
        format!("{} {ln}", user.first_name)
    } else {
        user.first_name.clone()
    };
    let actor_id = user.id.to_string();

    let kind = classify(msg)?;
    let mut event = InboundEvent::new(CHANNEL_NAME, &actor_id, kind);
    event.sender_name = Some(sender_name);
    Some(event)
}

fn classify(msg: TgMessage) -> Option<EventKind> {
    if let Some(text) = msg.text {
        return Some(EventKind::from_text(&text));
    }
    if let Some(loc) = msg.location {
        return Some(EventKind::Location {
            latitude: loc.latitude,
            longitude: loc.longitude,
        });
    }
    if let Some(contact) = msg.contact {
        let name = match contact.last_name {
            Some(ln) => format!("{} {ln}", contact.first_name),
            None => contact.first_name,
        };
        return Some(EventKind::Contact {
            phone: contact.phone_number,
            name: Some(name).filter(|n| !n.trim().is_empty()),
        });
    }

    let caption = msg.caption;
    let attachment = |media_type, file_id: String| {
        EventKind::Attachment(MediaAttachment {
            media_type,
            file_id,
            caption: caption.clone(),
        })
    };
    // Telegram sends several photo sizes; the last is the largest.
    if let Some(largest) = msg.photo.and_then(|sizes| sizes.into_iter().last()) {
        return Some(attachment(MediaType::Photo, largest.file_id));
    }
    if let Some(video) = msg.video {
        return Some(attachment(MediaType::Video, video.file_id));
    }
    if let Some(voice) = msg.voice {
        return Some(attachment(MediaType::Voice, voice.file_id));
    }
    if let Some(document) = msg.document {
        return Some(attachment(MediaType::Document, document.file_id));
    }

    debug!("telegram: skipping unsupported message in chat {}", msg.chat.id);
    None
}
