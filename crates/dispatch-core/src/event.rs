use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Texts that abandon the active wizard regardless of its step.
const CANCEL_KEYWORDS: &[&str] = &["/cancel", "cancel"];

/// An inbound event from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific actor id. Notifications are addressed to it.
    pub actor_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    pub fn new(channel: &str, actor_id: &str, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            actor_id: actor_id.to_string(),
            sender_name: None,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Build a text event, promoting cancel keywords to [`EventKind::Cancel`].
    pub fn text(channel: &str, actor_id: &str, text: &str) -> Self {
        Self::new(channel, actor_id, EventKind::from_text(text))
    }
}

/// What the actor sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Text(String),
    Location { latitude: f64, longitude: f64 },
    Contact { phone: String, name: Option<String> },
    Attachment(MediaAttachment),
    /// The universal cancel signal.
    Cancel,
}

impl EventKind {
    pub fn from_text(text: &str) -> Self {
        if is_cancel_keyword(text) {
            Self::Cancel
        } else {
            Self::Text(text.to_string())
        }
    }

    /// Short label for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Location { .. } => "location",
            Self::Contact { .. } => "contact",
            Self::Attachment(_) => "attachment",
            Self::Cancel => "cancel",
        }
    }
}

/// A file the actor attached. Only the platform reference is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub media_type: MediaType,
    pub file_id: String,
    pub caption: Option<String>,
}

impl MediaAttachment {
    /// Stable reference stored on tasks, e.g. `photo:AgAD...`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.media_type.as_str(), self.file_id)
    }
}

/// Supported attachment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    Voice,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Voice => "voice",
            Self::Document => "document",
        }
    }
}

/// An outbound notification. The content is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub actor_id: String,
    pub content: String,
}

impl Notification {
    pub fn new(actor_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            content: content.into(),
        }
    }
}

/// Whether `text` is the universal cancel signal.
pub fn is_cancel_keyword(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    // Strip @botname suffix (e.g. "/cancel@dispatch_bot").
    let word = lowered.split('@').next().unwrap_or_default();
    CANCEL_KEYWORDS.contains(&word)
}
