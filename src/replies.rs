//! User-facing texts.
//!
//! Notifications are plain text; the channel delivers them as-is.

use crate::commands::HistoryPeriod;
use crate::dialogue::state::DialogueState;
use crate::dialogue::Role;
use dispatch_core::debt::DebtRecord;
use dispatch_core::error::DispatchError;
use dispatch_core::task::{Task, TaskStatus};
use dispatch_memory::store::{TaskStatistics, Worker};
use rust_decimal::Decimal;

/// Most entries listed by `/history`; totals still cover everything.
const HISTORY_LIMIT: usize = 30;

pub const CANCELLED: &str = "Cancelled. Nothing was saved.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const SESSION_EXPIRED: &str =
    "Sorry, I lost track of what we were doing (the bot may have restarted). Please start again.";
pub const UNRECOGNIZED: &str = "I didn't understand that. Send /help to see what I can do.";
pub const STEP_MISMATCH: &str = "That doesn't fit this step.";
pub const BUSY: &str = "Finish the current step first, or send /cancel to abandon it.";
pub const TRY_AGAIN: &str = "Something went wrong while saving. Please try again.";

pub fn greeting(role: &Role) -> String {
    match role {
        Role::Dispatcher => "Hello, dispatcher.".to_string(),
        Role::Worker(worker) => format!("Hello, {}.", worker.name),
        Role::Guest => "Hello! I coordinate tasks between a dispatcher and field workers. \
             Ask your dispatcher to add you, and share your chat id (/getid)."
            .to_string(),
    }
}

pub fn help(role: &Role) -> String {
    let common = "/start - greeting (also resets)\n/help - this list\n/getid - your chat id\n/cancel - abandon the current step";
    match role {
        Role::Dispatcher => format!(
            "Dispatcher commands:\n\
             /assign - assign a new task\n\
             /tasks - open tasks\n\
             /history [week|month|paid] [worker] - completed tasks\n\
             /addworker - add a worker\n\
             /adddebt - record a debt\n\
             /debts - unpaid debts\n\
             /paid <id> - mark a debt paid\n\
             /stats - totals\n\
             {common}"
        ),
        Role::Worker(_) => format!(
            "Worker commands:\n\
             /tasks - your open tasks\n\
             /history [week|month|paid] - your completed tasks\n\
             /begin <id> - start a task\n\
             /finish <id> - report a task done\n\
             /debts - your unpaid debts\n\
             {common}"
        ),
        Role::Guest => format!("{common}\n/login - sign in as dispatcher"),
    }
}

/// The question asked on entering `state`. `workers` is the roster, used by
/// the steps that pick a worker.
pub fn prompt(state: &DialogueState, workers: &[Worker]) -> String {
    match state {
        DialogueState::Idle => "Done.".to_string(),
        DialogueState::AdminLogin => "Enter the access code.".to_string(),
        DialogueState::AssignDescription => "Describe the task.".to_string(),
        DialogueState::AssignLocation => {
            "Send the location, type an address, or type skip.".to_string()
        }
        DialogueState::AssignPayment => {
            "How much does the task pay? Type an amount or skip.".to_string()
        }
        DialogueState::AssignWorker => {
            format!("Who should do it? Type a name:\n{}", worker_list(workers))
        }
        DialogueState::AddWorkerName => "Enter the new worker's name.".to_string(),
        DialogueState::AddWorkerChatId => {
            "Enter the worker's chat id (they can get it with /getid).".to_string()
        }
        DialogueState::DebtSelectDebtor => format!(
            "Who owes? Type a name, or other for someone not on the roster:\n{}",
            worker_list(workers)
        ),
        DialogueState::DebtOtherName => "Type the debtor's name or share their contact.".to_string(),
        DialogueState::DebtAmount | DialogueState::DebtorAmount(_) => {
            "How much is owed?".to_string()
        }
        DialogueState::DebtReason | DialogueState::DebtorReason(_) => {
            "What is the debt for?".to_string()
        }
        DialogueState::DebtDueDate | DialogueState::DebtorDueDate(_) => {
            "When is it due? (YYYY-MM-DD or DD.MM.YYYY)".to_string()
        }
        DialogueState::CompleteReport(d) => format!(
            "Completing task #{}. Describe what was done (text or voice message).",
            d.task_id
        ),
        DialogueState::CompleteMedia(_) => {
            "Send a photo, video or document of the result, or type skip.".to_string()
        }
        DialogueState::CompleteSettlement(_) => {
            "How was it paid?\n1. cash\n2. card\n3. debt".to_string()
        }
        DialogueState::CashAmount(_) => "How much cash was received?".to_string(),
        DialogueState::CardAmount(_) => "How much was paid by card?".to_string(),
        DialogueState::DebtorName(_) => {
            "Who owes the money? Type a name, share a contact, or type me.".to_string()
        }
    }
}

fn worker_list(workers: &[Worker]) -> String {
    workers
        .iter()
        .map(|w| format!("- {}", w.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line task summary used in listings and notifications.
pub fn task_card(task: &Task) -> String {
    let mut out = format!("#{} [{}] {}", task.id, status_label(task.status), task.description);
    out.push_str(&format!("\nWorker: {}", task.assigned_to));
    if let Some(location) = &task.location {
        if let Some(address) = &location.address {
            out.push_str(&format!("\nAddress: {address}"));
        }
        if let Some(point) = location.point {
            out.push_str(&format!(
                "\nMap: https://maps.google.com/?q={},{}",
                point.latitude, point.longitude
            ));
        }
    }
    match task.payment_amount {
        Some(amount) => out.push_str(&format!("\nPayment: {amount}")),
        None => out.push_str("\nPayment: not specified"),
    }
    out
}

/// Completed-task summary: count, total received and the newest entries.
pub fn history(worker: Option<&str>, period: HistoryPeriod, tasks: &[Task]) -> String {
    let title = match period {
        HistoryPeriod::All => "all time",
        HistoryPeriod::Week => "last 7 days",
        HistoryPeriod::Month => "last 30 days",
        HistoryPeriod::Paid => "paid only",
    };
    let whose = worker.unwrap_or("all workers");
    if tasks.is_empty() {
        return format!("No completed tasks for {whose} ({title}).");
    }

    let total: Decimal = tasks.iter().map(|t| t.received_amount).sum();
    let mut out = format!(
        "Completed tasks for {whose} ({title}): {}\nTotal received: {total}",
        tasks.len()
    );
    for task in tasks.iter().rev().take(HISTORY_LIMIT) {
        let when = task.completed_at.as_deref().unwrap_or("?");
        out.push_str(&format!(
            "\n\n#{} {}\nWorker: {}\nCompleted: {when}\nReceived: {}",
            task.id, task.description, task.assigned_to, task.received_amount
        ));
        if let Some(report) = &task.completion_report {
            out.push_str(&format!("\nReport: {}", preview(report)));
        }
    }
    if tasks.len() > HISTORY_LIMIT {
        out.push_str(&format!("\n\n...and {} older.", tasks.len() - HISTORY_LIMIT));
    }
    out
}

fn preview(text: &str) -> String {
    const MAX: usize = 50;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in progress",
        TaskStatus::Completed => "completed",
    }
}

pub fn debt_line(debt: &DebtRecord) -> String {
    let task = debt
        .task_id
        .map(|id| format!(", task #{id}"))
        .unwrap_or_default();
    format!(
        "#{} {} owes {} for {} (due {}{task})",
        debt.id, debt.debtor_name, debt.amount, debt.reason, debt.due_date
    )
}

pub fn stats(stats: &TaskStatistics) -> String {
    format!(
        "Tasks: {} pending, {} in progress, {} completed\n\
         Received: {}\n\
         Unpaid debts: {} totalling {}",
        stats.pending,
        stats.in_progress,
        stats.completed,
        stats.total_received,
        stats.unpaid_debts,
        stats.unpaid_debt_total
    )
}

/// Reply for an error that ends the current operation.
pub fn rejection(err: &DispatchError) -> String {
    match err {
        DispatchError::InvalidTransition { task_id, from, .. } => match from {
            TaskStatus::Pending => format!("Task #{task_id} has not been started yet. Use /begin {task_id} first."),
            TaskStatus::InProgress => format!("Task #{task_id} is already in progress."),
            TaskStatus::Completed => format!("Task #{task_id} is already completed."),
        },
        DispatchError::TaskNotFound(id) => format!("There is no task #{id}."),
        DispatchError::DebtNotFound(id) => format!("There is no debt #{id}."),
        DispatchError::NotPermitted(what) => format!("Not available to you: {what}."),
        DispatchError::Validation(msg) => msg.clone(),
        DispatchError::CacheMiss(_) => SESSION_EXPIRED.to_string(),
        _ => TRY_AGAIN.to_string(),
    }
}
