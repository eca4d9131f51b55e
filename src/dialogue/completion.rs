//! `/finish`: report, optional media, settlement, and for debts the debtor
//! and terms. Nothing is written until the last answer; then the status
//! change, the received amount and any debt land in one transaction.

use super::router::{MediaInput, PersonInput, ReportInput};
use super::state::{CompletionDraft, DialogueState};
use super::{Dialogue, Role};
use crate::replies;
use dispatch_core::error::DispatchError;
use dispatch_core::input::{is_skip, parse_amount, parse_due_date, parse_positive_amount, required_text};
use dispatch_core::settlement::{DebtTerms, Settlement, SettlementMethod, Settler};
use dispatch_core::task::{CompletionReport, TaskId, TaskStatus};
use tracing::{info, warn};

/// Reply naming the worker as the debtor.
const SELF_DEBTOR: &str = "me";

impl Dialogue {
    pub(super) async fn start_completion(
        &self,
        actor: &str,
        role: &Role,
        task_id: Option<TaskId>,
    ) -> Result<(), DispatchError> {
        let worker = role.require_worker()?;
        let Some(task_id) = task_id else {
            self.reply(actor, "Usage: /finish <task id>").await;
            return Ok(());
        };
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(DispatchError::TaskNotFound(task_id))?;
        if task.assigned_to != worker.name {
            return Err(DispatchError::NotPermitted(format!(
                "task #{task_id} is assigned to someone else"
            )));
        }
        task.status.check_transition(task_id, TaskStatus::Completed)?;
        self.advance(actor, &DialogueState::CompleteReport(CompletionDraft::new(task_id)))
            .await
    }

    pub(super) async fn completion_report(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        input: ReportInput<'_>,
    ) -> Result<(), DispatchError> {
        let report = match input {
            ReportInput::Text(text) => required_text(text, "The report")?,
            ReportInput::Voice(media) => media.reference(),
        };
        let draft = CompletionDraft {
            report: Some(report),
            ..draft.clone()
        };
        self.advance(actor, &DialogueState::CompleteMedia(draft)).await
    }

    pub(super) async fn completion_media(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        input: MediaInput<'_>,
    ) -> Result<(), DispatchError> {
        let media = match input {
            MediaInput::Attachment(media) => Some(media.reference()),
            MediaInput::Text(text) if is_skip(text) => None,
            MediaInput::Text(_) => {
                return Err(DispatchError::Validation(
                    "Send a photo, video or document, or type skip.".into(),
                ))
            }
        };
        let draft = CompletionDraft {
            media,
            ..draft.clone()
        };
        self.advance(actor, &DialogueState::CompleteSettlement(draft))
            .await
    }

    pub(super) async fn completion_settlement(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        text: &str,
    ) -> Result<(), DispatchError> {
        let next = match SettlementMethod::from_choice(text) {
            Some(SettlementMethod::Cash) => DialogueState::CashAmount(draft.clone()),
            Some(SettlementMethod::Card) => DialogueState::CardAmount(draft.clone()),
            Some(SettlementMethod::Debt) => DialogueState::DebtorName(draft.clone()),
            None => {
                return Err(DispatchError::Validation(
                    "Please answer 1, 2 or 3.".into(),
                ))
            }
        };
        self.advance(actor, &next).await
    }

    /// Cash or card amount: the last step for those methods.
    pub(super) async fn completion_paid(
        &self,
        actor: &str,
        role: &Role,
        draft: &CompletionDraft,
        method: SettlementMethod,
        text: &str,
    ) -> Result<(), DispatchError> {
        let amount = parse_amount(text)?;
        let settlement = match method {
            SettlementMethod::Card => Settlement::Card { amount },
            _ => Settlement::Cash { amount },
        };
        self.finish_completion(actor, role, draft, settlement).await
    }

    pub(super) async fn completion_debtor(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        person: PersonInput<'_>,
    ) -> Result<(), DispatchError> {
        let (debtor_name, debtor_contact) = match person {
            PersonInput::Name(text) if text.trim().eq_ignore_ascii_case(SELF_DEBTOR) => {
                (None, None)
            }
            PersonInput::Name(text) => (Some(required_text(text, "The name")?), None),
            PersonInput::Contact { phone, name } => (
                Some(
                    name.filter(|n| !n.trim().is_empty())
                        .unwrap_or(phone)
                        .trim()
                        .to_string(),
                ),
                Some(phone.to_string()),
            ),
        };
        let draft = CompletionDraft {
            debtor_name,
            debtor_contact,
            ..draft.clone()
        };
        self.advance(actor, &DialogueState::DebtorAmount(draft)).await
    }

    pub(super) async fn completion_debt_amount(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        text: &str,
    ) -> Result<(), DispatchError> {
        let draft = CompletionDraft {
            debt_amount: Some(parse_positive_amount(text)?),
            ..draft.clone()
        };
        self.advance(actor, &DialogueState::DebtorReason(draft)).await
    }

    pub(super) async fn completion_debt_reason(
        &self,
        actor: &str,
        draft: &CompletionDraft,
        text: &str,
    ) -> Result<(), DispatchError> {
        let draft = CompletionDraft {
            debt_reason: Some(required_text(text, "The reason")?),
            ..draft.clone()
        };
        self.advance(actor, &DialogueState::DebtorDueDate(draft)).await
    }

    pub(super) async fn completion_debt_due(
        &self,
        actor: &str,
        role: &Role,
        draft: &CompletionDraft,
        text: &str,
    ) -> Result<(), DispatchError> {
        let due_date = parse_due_date(text)?;
        let (Some(amount), Some(reason)) = (draft.debt_amount, draft.debt_reason.clone()) else {
            return Err(DispatchError::CacheMiss(format!(
                "completion draft for task #{} is missing debt terms",
                draft.task_id
            )));
        };
        let settlement = Settlement::Debt(DebtTerms {
            debtor_name: draft.debtor_name.clone(),
            debtor_contact: draft.debtor_contact.clone(),
            amount,
            reason,
            due_date,
        });
        self.finish_completion(actor, role, draft, settlement).await
    }

    async fn finish_completion(
        &self,
        actor: &str,
        role: &Role,
        draft: &CompletionDraft,
        settlement: Settlement,
    ) -> Result<(), DispatchError> {
        let worker = role.require_worker()?;
        let Some(report) = draft.report.clone() else {
            return Err(DispatchError::CacheMiss(format!(
                "completion draft for task #{} has no report",
                draft.task_id
            )));
        };
        let outcome = settlement.resolve(
            draft.task_id,
            Settler {
                name: &worker.name,
                contact: Some(actor),
            },
        )?;
        let completion = self
            .store
            .complete_task(
                draft.task_id,
                &worker.name,
                &CompletionReport {
                    report,
                    media: draft.media.clone(),
                },
                &outcome,
            )
            .await?;

        // Committed. Failures from here on must not reach the worker as errors.
        if let Err(e) = self.clear(actor).await {
            warn!("task #{} completed but resetting {actor} failed: {e}", draft.task_id);
        }

        let task = &completion.task;
        info!(
            "task #{} completed by {} ({}, received {})",
            task.id, worker.name, outcome.method, outcome.received_amount
        );

        let mut summary = format!(
            "{} completed task #{}: {}\nReport: {}\nSettlement: {}, received {}",
            worker.name,
            task.id,
            task.description,
            task.completion_report.as_deref().unwrap_or_default(),
            outcome.method,
            outcome.received_amount
        );
        if let Some(media) = &task.completion_media {
            summary.push_str(&format!("\nMedia: {media}"));
        }
        if let Some(debt_id) = completion.debt_id {
            match self.store.get_debt(debt_id).await {
                Ok(Some(debt)) => {
                    summary.push_str(&format!("\nDebt: {}", replies::debt_line(&debt)));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("failed to load debt #{debt_id} for the summary: {e}");
                    summary.push_str(&format!("\nDebt: #{debt_id}"));
                }
            }
        }
        self.notify(&task.assigned_by, summary).await;

        let reply = match completion.debt_id {
            Some(debt_id) => format!("Task #{} completed. Debt #{debt_id} recorded.", task.id),
            None => format!("Task #{} completed.", task.id),
        };
        self.reply(actor, &reply).await;
        Ok(())
    }
}
