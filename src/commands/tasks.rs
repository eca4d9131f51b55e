//! Task listings, `/history` and `/begin`.

use super::{CommandContext, HistoryPeriod};
use crate::dialogue::Role;
use crate::replies;
use chrono::{Duration, NaiveDateTime, Utc};
use dispatch_core::error::DispatchError;
use dispatch_core::task::{TaskFilter, TaskId, TaskStatus};

pub(super) async fn handle_tasks(ctx: &CommandContext<'_>) -> Result<String, DispatchError> {
    let filter = match ctx.role {
        Role::Dispatcher => TaskFilter::open(),
        Role::Worker(worker) => TaskFilter::for_worker(&worker.name)
            .with_statuses(&[TaskStatus::Pending, TaskStatus::InProgress]),
        Role::Guest => {
            return Err(DispatchError::NotPermitted("task list".into()));
        }
    };
    let tasks = ctx.store.list_tasks(&filter).await?;
    if tasks.is_empty() {
        return Ok("No open tasks.".to_string());
    }

    let mut out = format!("Open tasks ({}):", tasks.len());
    for task in &tasks {
        out.push_str("\n\n");
        out.push_str(&replies::task_card(task));
    }
    Ok(out)
}

pub(super) async fn handle_begin(
    ctx: &CommandContext<'_>,
    task_id: Option<TaskId>,
) -> Result<String, DispatchError> {
    let worker = ctx.role.require_worker()?;
    let Some(task_id) = task_id else {
        return Ok("Usage: /begin <task id>".to_string());
    };

    let task = ctx.store.start_task(task_id, &worker.name).await?;
    ctx.notify_other(
        &task.assigned_by,
        format!("{} started task #{}: {}", worker.name, task.id, task.description),
    )
    .await;
    Ok(format!(
        "Task #{} started. Send /finish {} when the work is done.",
        task.id, task.id
    ))
}

/// Completed tasks for the period. Workers see their own; dispatchers see
/// everyone's or one named worker's.
pub(super) async fn handle_history(
    ctx: &CommandContext<'_>,
    period: HistoryPeriod,
    worker: Option<&str>,
) -> Result<String, DispatchError> {
    let subject = match ctx.role {
        Role::Worker(w) => Some(w.name.clone()),
        Role::Dispatcher => match worker {
            Some(name) => match ctx.store.find_worker(name).await? {
                Some(w) => Some(w.name),
                None => {
                    return Err(DispatchError::Validation(format!(
                        "There is no worker named '{name}'."
                    )))
                }
            },
            None => None,
        },
        Role::Guest => return Err(DispatchError::NotPermitted("task history".into())),
    };

    let filter = history_filter(
        TaskFilter::completed(subject.as_deref()),
        period,
        Utc::now().naive_utc(),
    );
    let tasks = ctx.store.list_tasks(&filter).await?;
    Ok(replies::history(subject.as_deref(), period, &tasks))
}

fn history_filter(filter: TaskFilter, period: HistoryPeriod, now: NaiveDateTime) -> TaskFilter {
    match period {
        HistoryPeriod::All => filter,
        HistoryPeriod::Week => filter.completed_since(now - Duration::days(7)),
        HistoryPeriod::Month => filter.completed_since(now - Duration::days(30)),
        HistoryPeriod::Paid => filter.paid_only(),
    }
}
