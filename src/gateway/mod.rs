//! Gateway: the main event loop connecting channels to the dialogue engine.
//!
//! Events are serialized per actor through [`ActorQueues`]; replies and
//! notifications go back out through [`ChannelNotifier`].

mod queue;

use crate::dialogue::Dialogue;
use async_trait::async_trait;
use dispatch_core::error::DispatchError;
use dispatch_core::event::{InboundEvent, Notification};
use dispatch_core::traits::{Channel, Notifier};
pub use queue::ActorQueues;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Channel notifications are delivered through.
const NOTIFY_CHANNEL: &str = "telegram";

/// Delivers notifications through the configured channels.
#[derive(Clone)]
pub struct ChannelNotifier {
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl ChannelNotifier {
    pub fn new(channels: HashMap<String, Arc<dyn Channel>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DispatchError> {
        let channel = self.channels.get(NOTIFY_CHANNEL).ok_or_else(|| {
            DispatchError::Channel(format!("channel '{NOTIFY_CHANNEL}' is not running"))
        })?;
        channel.send(notification).await
    }
}

/// The central gateway that feeds channel events to the dialogue engine.
pub struct Gateway {
    channels: HashMap<String, Arc<dyn Channel>>,
    dialogue: Arc<Dialogue>,
    queues: Arc<ActorQueues>,
}

impl Gateway {
    pub fn new(channels: HashMap<String, Arc<dyn Channel>>, dialogue: Dialogue) -> Self {
        Self {
            channels,
            dialogue: Arc::new(dialogue),
            queues: Arc::new(ActorQueues::new()),
        }
    }

    /// Run the main event loop until ctrl-c.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "Dispatch gateway running | channels: {}",
            self.channels.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        let (tx, mut rx) = mpsc::channel::<InboundEvent>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(event) = channel_rx.recv().await {
                    if tx.send(event).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        loop {
            tokio::select! {
                incoming = rx.recv() => match incoming {
                    Some(event) => self.dispatch_event(event),
                    None => {
                        info!("all channels closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Queue the event behind any earlier ones from the same actor, starting
    /// a drain task if the actor was idle.
    fn dispatch_event(&self, event: InboundEvent) {
        let actor = event.actor_id.clone();
        if !self.queues.enqueue(event) {
            debug!("queued event from {actor} behind one in progress");
            return;
        }
        let queues = self.queues.clone();
        let dialogue = self.dialogue.clone();
        tokio::spawn(async move {
            drain(queues, dialogue, actor).await;
        });
    }

    async fn shutdown(&self) {
        info!("Shutting down...");
        let active = self.queues.active();
        if active > 0 {
            warn!("{active} actor(s) still had events in flight");
        }
        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }
        info!("Shutdown complete.");
    }
}

/// Process the actor's events one at a time until the queue is empty.
async fn drain(queues: Arc<ActorQueues>, dialogue: Arc<Dialogue>, actor: String) {
    while let Some(event) = queues.next(&actor) {
        dialogue.handle(&event).await;
    }
}
