//! Message sending and command registration.

use super::TelegramChannel;
use crate::utils::split_message;
use dispatch_core::error::DispatchError;
use tracing::{info, warn};

/// Telegram's per-message character limit.
const MAX_MESSAGE_LEN: usize = 4096;

impl TelegramChannel {
    /// Send a plain text message to a specific chat.
    pub(crate) async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DispatchError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let url = format!("{}/sendMessage", self.base_url);
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| DispatchError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let error_text = resp.text().await.unwrap_or_default();
                return Err(DispatchError::Channel(format!(
                    "telegram send failed ({status}): {error_text}"
                )));
            }
        }

        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "start", "description": "Greeting; resets any active wizard" },
                { "command": "help", "description": "Show available commands" },
                { "command": "getid", "description": "Show your chat id" },
                { "command": "tasks", "description": "List open tasks" },
                { "command": "begin", "description": "Start a task: /begin <id>" },
                { "command": "finish", "description": "Complete a task: /finish <id>" },
                { "command": "assign", "description": "Assign a new task" },
                { "command": "addworker", "description": "Add a worker to the roster" },
                { "command": "adddebt", "description": "Record a debt" },
                { "command": "debts", "description": "List unpaid debts" },
                { "command": "paid", "description": "Mark a debt paid: /paid <id>" },
                { "command": "stats", "description": "Task and debt totals" },
                { "command": "login", "description": "Sign in as dispatcher" },
                { "command": "cancel", "description": "Abandon the current wizard" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&commands).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
