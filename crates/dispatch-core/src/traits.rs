use crate::{
    error::DispatchError,
    event::{InboundEvent, Notification},
};
use async_trait::async_trait;

/// Messaging Channel trait: where events come from.
///
/// Every messaging platform implements this trait to receive events and
/// deliver notifications.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for inbound events.
    /// Returns a receiver that yields them in arrival order.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<InboundEvent>, DispatchError>;

    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), DispatchError>;
}

/// Outbound notification delivery, as seen by the dialogue engine.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Per-actor scratch space for wizards that assemble a record field by field.
///
/// Entries are opaque JSON strings keyed by actor id. An implementation may
/// or may not survive a restart; callers must treat a missing entry while a
/// wizard is active as [`DispatchError::CacheMiss`].
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn load(&self, actor_id: &str) -> Result<Option<String>, DispatchError>;

    async fn save(&self, actor_id: &str, data: &str) -> Result<(), DispatchError>;

    async fn evict(&self, actor_id: &str) -> Result<(), DispatchError>;

    /// Whether entries survive a process restart.
    fn is_durable(&self) -> bool;
}
