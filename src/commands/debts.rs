//! Debt listings and `/paid`.

use super::CommandContext;
use crate::dialogue::Role;
use crate::replies;
use dispatch_core::debt::{DebtFilter, DebtId};
use dispatch_core::error::DispatchError;
use rust_decimal::Decimal;

pub(super) async fn handle_debts(ctx: &CommandContext<'_>) -> Result<String, DispatchError> {
    let filter = match ctx.role {
        Role::Dispatcher => DebtFilter::unpaid(),
        Role::Worker(worker) => DebtFilter::unpaid_for(&worker.name),
        Role::Guest => return Err(DispatchError::NotPermitted("debt list".into())),
    };
    let debts = ctx.store.list_debts(&filter).await?;
    if debts.is_empty() {
        return Ok("No unpaid debts.".to_string());
    }

    let total: Decimal = debts.iter().map(|d| d.amount).sum();
    let mut out = format!("Unpaid debts ({}), total {total}:", debts.len());
    for debt in &debts {
        out.push('\n');
        out.push_str(&replies::debt_line(debt));
    }
    Ok(out)
}

pub(super) async fn handle_paid(
    ctx: &CommandContext<'_>,
    debt_id: Option<DebtId>,
) -> Result<String, DispatchError> {
    ctx.role.require_dispatcher()?;
    let Some(debt_id) = debt_id else {
        return Ok("Usage: /paid <debt id>".to_string());
    };

    let debt = ctx.store.mark_debt_paid(debt_id).await?;
    if let Some(contact) = debt.debtor_contact.as_deref() {
        // Only actors we can reach get a message; phone numbers do not.
        if ctx.store.worker_for_actor(contact).await?.is_some() {
            ctx.notify_other(
                contact,
                format!(
                    "Your debt #{} of {} ({}) is marked as paid.",
                    debt.id, debt.amount, debt.reason
                ),
            )
            .await;
        }
    }
    Ok(format!(
        "Debt #{} ({}, {}) marked as paid.",
        debt.id, debt.debtor_name, debt.amount
    ))
}
