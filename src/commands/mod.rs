//! Built-in commands that answer immediately, without a wizard.
//!
//! Wizard-opening commands (`/assign`, `/addworker`, `/adddebt`, `/login`,
//! `/finish`) are parsed here too but handled by the dialogue engine.

mod debts;
mod status;
mod tasks;

#[cfg(test)]
mod tests;

use crate::dialogue::Role;
use dispatch_core::debt::DebtId;
use dispatch_core::error::DispatchError;
use dispatch_core::event::Notification;
use dispatch_core::task::TaskId;
use dispatch_core::traits::Notifier;
use dispatch_memory::Store;
use tracing::warn;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub notifier: &'a dyn Notifier,
    pub actor_id: &'a str,
    pub role: &'a Role,
}

impl CommandContext<'_> {
    /// Best-effort notification to another actor.
    pub(crate) async fn notify_other(&self, actor_id: &str, content: String) {
        let notification = Notification::new(actor_id, content);
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("failed to notify {actor_id}: {e}");
        }
    }
}

/// Window for `/history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPeriod {
    #[default]
    All,
    Week,
    Month,
    Paid,
}

impl HistoryPeriod {
    fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Known bot commands. Numeric arguments that are missing or malformed
/// parse as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    GetId,
    Tasks,
    Begin(Option<TaskId>),
    /// Completed tasks. `worker` is only honored for dispatchers.
    History {
        period: HistoryPeriod,
        worker: Option<String>,
    },
    Finish(Option<TaskId>),
    Assign,
    AddWorker,
    AddDebt,
    Debts,
    Paid(Option<DebtId>),
    Stats,
    Login,
}

impl Command {
    /// Parse a command from message text. Returns `None` for anything that is
    /// not a known `/command`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let first = words.next()?;
        // Strip @botname suffix (e.g. "/help@dispatch_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first).to_lowercase();
        let id_arg = || {
            text.split_whitespace()
                .nth(1)
                .and_then(|arg| arg.trim_start_matches('#').parse::<i64>().ok())
        };
        match cmd.as_str() {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/getid" | "/id" => Some(Self::GetId),
            "/tasks" => Some(Self::Tasks),
            "/history" => Some(parse_history(words)),
            "/begin" => Some(Self::Begin(id_arg())),
            "/finish" | "/complete" => Some(Self::Finish(id_arg())),
            "/assign" => Some(Self::Assign),
            "/addworker" => Some(Self::AddWorker),
            "/adddebt" => Some(Self::AddDebt),
            "/debts" => Some(Self::Debts),
            "/paid" => Some(Self::Paid(id_arg())),
            "/stats" => Some(Self::Stats),
            "/login" => Some(Self::Login),
            _ => None,
        }
    }
}

/// `/history [week|month|paid|all] [worker name]`, in either order.
fn parse_history<'a>(args: impl Iterator<Item = &'a str>) -> Command {
    let mut period = None;
    let mut name = Vec::new();
    for word in args {
        match HistoryPeriod::parse(word) {
            Some(p) if period.is_none() => period = Some(p),
            _ => name.push(word),
        }
    }
    Command::History {
        period: period.unwrap_or_default(),
        worker: (!name.is_empty()).then(|| name.join(" ")),
    }
}

/// Handle a direct command and return the reply for the actor.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> Result<String, DispatchError> {
    match cmd {
        Command::Start => Ok(status::handle_start(ctx.role)),
        Command::Help => Ok(status::handle_help(ctx.role)),
        Command::GetId => Ok(status::handle_getid(ctx.actor_id)),
        Command::Stats => status::handle_stats(ctx).await,
        Command::Tasks => tasks::handle_tasks(ctx).await,
        Command::Begin(id) => tasks::handle_begin(ctx, id).await,
        Command::History { period, worker } => {
            tasks::handle_history(ctx, period, worker.as_deref()).await
        }
        Command::Debts => debts::handle_debts(ctx).await,
        Command::Paid(id) => debts::handle_paid(ctx, id).await,
        // Wizards are opened by the dialogue engine before reaching here.
        Command::Finish(_)
        | Command::Assign
        | Command::AddWorker
        | Command::AddDebt
        | Command::Login => Ok(status::handle_help(ctx.role)),
    }
}
