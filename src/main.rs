mod commands;
mod dialogue;
mod gateway;
mod replies;

use clap::{Parser, Subcommand};
use dispatch_channels::telegram::TelegramChannel;
use dispatch_core::{config, shellexpand, traits::SessionCache};
use dispatch_memory::{DurableSessionCache, MemorySessionCache, Store};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "dispatch",
    version,
    about = "Conversational task dispatch between a dispatcher and field workers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show configuration, channel state and task totals.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _guard = init_logging(&cfg.dispatch.data_dir, &cfg.dispatch.log_level)?;

            let mut channels: HashMap<String, Arc<dyn dispatch_core::traits::Channel>> =
                HashMap::new();

            if let Some(ref tg) = cfg.channel.telegram {
                if tg.enabled {
                    if tg.bot_token.is_empty() {
                        anyhow::bail!(
                            "Telegram is enabled but bot_token is empty. \
                             Set it in config.toml or {} env var.",
                            config::BOT_TOKEN_ENV
                        );
                    }
                    let channel = TelegramChannel::new(tg.clone());
                    channels.insert("telegram".to_string(), Arc::new(channel));
                }
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable telegram in config.toml.");
            }

            let store = Store::new(&cfg.store).await?;
            let seeded = store.seed_workers(&cfg.workers).await?;
            if seeded > 0 {
                info!("seeded {seeded} worker(s) from config");
            }

            let sessions: Arc<dyn SessionCache> = if cfg.session.durable {
                Arc::new(DurableSessionCache::new(store.clone()))
            } else {
                Arc::new(MemorySessionCache::new())
            };
            info!(
                "wizard drafts kept {}",
                if sessions.is_durable() {
                    "in the database"
                } else {
                    "in memory"
                }
            );

            let notifier = Arc::new(gateway::ChannelNotifier::new(channels.clone()));
            let dialogue = dialogue::Dialogue::new(store, sessions, notifier, cfg.access.clone());

            println!("{}: starting...", cfg.dispatch.name);
            gateway::Gateway::new(channels, dialogue).run().await?;
        }
        Commands::Status => {
            println!("{}: status check\n", cfg.dispatch.name);
            println!("Config: {}", cli.config);
            println!("Database: {}", shellexpand(&cfg.store.db_path));
            println!(
                "Wizard drafts: {}",
                if cfg.session.durable {
                    "durable"
                } else {
                    "in memory"
                }
            );
            println!("Dispatchers configured: {}", cfg.access.dispatchers.len());
            println!(
                "Login: {}",
                if cfg.access.access_code.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!();

            if let Some(ref tg) = cfg.channel.telegram {
                println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                );
            } else {
                println!("  telegram: not configured");
            }
            println!();

            let store = Store::new(&cfg.store).await?;
            let stats = store.task_statistics().await?;
            println!("{}", replies::stats(&stats));
            println!("Workers: {}", store.list_workers().await?.len());
            println!("Database size: {} bytes", store.db_size().await?);
        }
    }

    Ok(())
}

/// Log to stdout and to a daily file under `{data_dir}/logs`.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes
/// the file writer on drop.
fn init_logging(data_dir: &str, level: &str) -> anyhow::Result<WorkerGuard> {
    let log_dir = PathBuf::from(shellexpand(data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "dispatch.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}
