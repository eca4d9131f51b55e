//! Long-polling update loop and Channel trait implementation.

use super::parse::{to_event, CHANNEL_NAME};
use super::types::{TgResponse, TgUpdate};
use super::TelegramChannel;
use async_trait::async_trait;
use dispatch_core::{
    error::DispatchError,
    event::{InboundEvent, Notification},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{error, info};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, DispatchError> {
        if self.config.bot_token.is_empty() {
            return Err(DispatchError::Channel("telegram bot_token is empty".into()));
        }
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                // Updates arrive ordered by update_id; forward them in that order.
                for update in updates {
                    let Some(event) = update
                        .message
                        .and_then(|msg| to_event(msg, &allowed_users))
                    else {
                        continue;
                    };

                    if tx.send(event).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let chat_id: i64 = notification.actor_id.parse().map_err(|e| {
            DispatchError::Channel(format!(
                "invalid telegram chat_id '{}': {e}",
                notification.actor_id
            ))
        })?;

        self.send_text(chat_id, &notification.content).await
    }

    async fn stop(&self) -> Result<(), DispatchError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}
