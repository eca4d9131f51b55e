mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::DispatchError;
use defaults::*;

/// Environment variable that overrides `channel.telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level Dispatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub access: AccessConfig,
    /// Seed roster. Workers added at runtime live in the store.
    #[serde(default)]
    pub workers: Vec<WorkerEntry>,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Wizard session cache config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Keep wizard drafts in the database so they survive restarts.
    /// When false, drafts live in process memory and a restart mid-wizard
    /// sends the actor back to the start.
    #[serde(default)]
    pub durable: bool,
}

/// Who may act as dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Actor ids with the dispatcher role from the start.
    #[serde(default)]
    pub dispatchers: Vec<String>,
    /// Code accepted by `/login`. Unset = login disabled.
    #[serde(default)]
    pub access_code: Option<String>,
}

/// A worker in the seed roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub name: String,
    pub chat_id: i64,
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. The bot token from
/// the environment wins over the file.
pub fn load(path: &str) -> Result<Config, DispatchError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        parse(&content)?
    };

    if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
        apply_token_override(&mut config, token);
    }

    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse(content: &str) -> Result<Config, DispatchError> {
    let config: Config = toml::from_str(content)
        .map_err(|e| DispatchError::Config(format!("failed to parse config: {}", e)))?;
    validate(&config)?;
    Ok(config)
}

fn apply_token_override(config: &mut Config, token: String) {
    if token.is_empty() {
        return;
    }
    match config.channel.telegram {
        Some(ref mut tg) => tg.bot_token = token,
        None => {
            config.channel.telegram = Some(TelegramConfig {
                enabled: true,
                bot_token: token,
                allowed_users: Vec::new(),
            });
        }
    }
}

fn validate(config: &Config) -> Result<(), DispatchError> {
    let mut names = std::collections::HashSet::new();
    let mut chat_ids = std::collections::HashSet::new();
    for worker in &config.workers {
        if worker.name.trim().is_empty() {
            return Err(DispatchError::Config("worker name must not be empty".into()));
        }
        if !names.insert(worker.name.as_str()) {
            return Err(DispatchError::Config(format!(
                "duplicate worker name '{}'",
                worker.name
            )));
        }
        if !chat_ids.insert(worker.chat_id) {
            return Err(DispatchError::Config(format!(
                "duplicate worker chat_id {}",
                worker.chat_id
            )));
        }
    }
    if matches!(config.access.access_code.as_deref(), Some(code) if code.trim().is_empty()) {
        return Err(DispatchError::Config(
            "access_code must not be blank (omit it to disable /login)".into(),
        ));
    }
    Ok(())
}
