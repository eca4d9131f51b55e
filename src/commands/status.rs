//! Greeting, help, chat id and statistics.

use super::CommandContext;
use crate::dialogue::Role;
use crate::replies;
use dispatch_core::error::DispatchError;

pub(super) fn handle_start(role: &Role) -> String {
    format!("{}\n\n{}", replies::greeting(role), replies::help(role))
}

pub(super) fn handle_help(role: &Role) -> String {
    replies::help(role)
}

pub(super) fn handle_getid(actor_id: &str) -> String {
    format!("Your chat id: {actor_id}")
}

pub(super) async fn handle_stats(ctx: &CommandContext<'_>) -> Result<String, DispatchError> {
    ctx.role.require_dispatcher()?;
    let stats = ctx.store.task_statistics().await?;
    Ok(replies::stats(&stats))
}
