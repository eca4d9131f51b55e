//! `/adddebt`: a dispatcher records a debt not tied to any task.

use super::router::PersonInput;
use super::state::{DebtDraft, DialogueState, DraftKind, WizardDraft};
use super::{Dialogue, Role};
use crate::replies;
use dispatch_core::debt::NewDebt;
use dispatch_core::error::DispatchError;
use dispatch_core::input::{parse_due_date, parse_positive_amount, required_text};
use tracing::info;

/// Reply that picks a debtor who is not on the roster.
const OTHER_DEBTOR: &str = "other";

impl Dialogue {
    pub(super) async fn start_manual_debt(&self, actor: &str, role: &Role) -> Result<(), DispatchError> {
        role.require_dispatcher()?;
        self.save_draft(actor, &WizardDraft::Debt(DebtDraft::default()))
            .await?;
        self.advance(actor, &DialogueState::DebtSelectDebtor).await
    }

    pub(super) async fn debt_select_debtor(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(OTHER_DEBTOR) {
            self.debt_draft(actor).await?;
            return self.advance(actor, &DialogueState::DebtOtherName).await;
        }
        let Some(worker) = self.store.find_worker(text).await? else {
            return Err(DispatchError::Validation(format!(
                "There is no worker named '{text}'."
            )));
        };
        let mut draft = self.debt_draft(actor).await?;
        draft.debtor_contact = Some(worker.actor_id());
        draft.debtor_name = Some(worker.name);
        self.save_draft(actor, &WizardDraft::Debt(draft)).await?;
        self.advance(actor, &DialogueState::DebtAmount).await
    }

    pub(super) async fn debt_other_name(
        &self,
        actor: &str,
        person: PersonInput<'_>,
    ) -> Result<(), DispatchError> {
        let (name, contact) = match person {
            PersonInput::Name(text) => (required_text(text, "The name")?, None),
            PersonInput::Contact { phone, name } => (
                name.filter(|n| !n.trim().is_empty())
                    .unwrap_or(phone)
                    .trim()
                    .to_string(),
                Some(phone.to_string()),
            ),
        };
        let mut draft = self.debt_draft(actor).await?;
        draft.debtor_name = Some(name);
        draft.debtor_contact = contact;
        self.save_draft(actor, &WizardDraft::Debt(draft)).await?;
        self.advance(actor, &DialogueState::DebtAmount).await
    }

    pub(super) async fn debt_amount(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let amount = parse_positive_amount(text)?;
        let mut draft = self.debt_draft(actor).await?;
        draft.amount = Some(amount);
        self.save_draft(actor, &WizardDraft::Debt(draft)).await?;
        self.advance(actor, &DialogueState::DebtReason).await
    }

    pub(super) async fn debt_reason(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let reason = required_text(text, "The reason")?;
        let mut draft = self.debt_draft(actor).await?;
        draft.reason = Some(reason);
        self.save_draft(actor, &WizardDraft::Debt(draft)).await?;
        self.advance(actor, &DialogueState::DebtDueDate).await
    }

    pub(super) async fn debt_due_date(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let due_date = parse_due_date(text)?;
        let draft = self.debt_draft(actor).await?;
        let (Some(debtor_name), Some(amount), Some(reason)) =
            (draft.debtor_name, draft.amount, draft.reason)
        else {
            return Err(DispatchError::CacheMiss(format!(
                "debt draft for {actor} is incomplete"
            )));
        };

        let debt = self
            .store
            .create_debt(&NewDebt {
                debtor_name,
                debtor_contact: draft.debtor_contact,
                task_id: None,
                amount,
                reason,
                due_date,
            })
            .await?;
        self.clear(actor).await?;
        info!("{actor} recorded debt #{} for {}", debt.id, debt.debtor_name);

        if let Some(contact) = &debt.debtor_contact {
            if let Some(worker) = self.store.worker_for_actor(contact).await? {
                self.notify(
                    &worker.actor_id(),
                    format!("A debt was recorded for you:\n{}", replies::debt_line(&debt)),
                )
                .await;
            }
        }
        self.reply(actor, &format!("Debt recorded:\n{}", replies::debt_line(&debt)))
            .await;
        Ok(())
    }

    async fn debt_draft(&self, actor: &str) -> Result<DebtDraft, DispatchError> {
        match self.load_draft(actor, DraftKind::Debt).await? {
            WizardDraft::Debt(draft) => Ok(draft),
            _ => Err(DispatchError::CacheMiss(format!("no debt draft for {actor}"))),
        }
    }
}
