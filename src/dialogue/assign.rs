//! `/assign`: description, location, payment, worker, then the task is created.

use super::router::LocationInput;
use super::state::{DialogueState, DraftKind, TaskDraft, WizardDraft};
use super::{Dialogue, Role};
use crate::replies;
use dispatch_core::error::DispatchError;
use dispatch_core::input::{is_skip, parse_amount, required_text};
use dispatch_core::task::{NewTask, TaskLocation};
use tracing::info;

impl Dialogue {
    pub(super) async fn start_assign(&self, actor: &str, role: &Role) -> Result<(), DispatchError> {
        role.require_dispatcher()?;
        if self.store.list_workers().await?.is_empty() {
            self.reply(actor, "There are no workers yet. Add one with /addworker first.")
                .await;
            return Ok(());
        }
        self.save_draft(actor, &WizardDraft::Task(TaskDraft::default()))
            .await?;
        self.advance(actor, &DialogueState::AssignDescription).await
    }

    pub(super) async fn assign_description(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let description = required_text(text, "The description")?;
        let mut draft = self.task_draft(actor).await?;
        draft.description = Some(description);
        self.save_draft(actor, &WizardDraft::Task(draft)).await?;
        self.advance(actor, &DialogueState::AssignLocation).await
    }

    pub(super) async fn assign_location(
        &self,
        actor: &str,
        input: LocationInput<'_>,
    ) -> Result<(), DispatchError> {
        let location = match input {
            LocationInput::Point(point) => Some(TaskLocation {
                point: Some(point),
                address: None,
            }),
            LocationInput::Text(text) if is_skip(text) => None,
            LocationInput::Text(text) => Some(TaskLocation {
                point: None,
                address: Some(required_text(text, "The address")?),
            }),
        };
        let mut draft = self.task_draft(actor).await?;
        draft.location = location;
        self.save_draft(actor, &WizardDraft::Task(draft)).await?;
        self.advance(actor, &DialogueState::AssignPayment).await
    }

    pub(super) async fn assign_payment(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let amount = if is_skip(text) {
            None
        } else {
            Some(parse_amount(text)?)
        };
        let mut draft = self.task_draft(actor).await?;
        draft.payment_amount = amount;
        self.save_draft(actor, &WizardDraft::Task(draft)).await?;
        self.advance(actor, &DialogueState::AssignWorker).await
    }

    pub(super) async fn assign_worker(&self, actor: &str, name: &str) -> Result<(), DispatchError> {
        let Some(worker) = self.store.find_worker(name.trim()).await? else {
            return Err(DispatchError::Validation(format!(
                "There is no worker named '{}'.",
                name.trim()
            )));
        };
        let draft = self.task_draft(actor).await?;
        let Some(description) = draft.description else {
            return Err(DispatchError::CacheMiss(format!(
                "task draft for {actor} has no description"
            )));
        };

        let task = self
            .store
            .create_task(&NewTask {
                description,
                location: draft.location,
                payment_amount: draft.payment_amount,
                assigned_to: worker.name.clone(),
                assigned_by: actor.to_string(),
            })
            .await?;
        self.clear(actor).await?;
        info!("task #{} assigned to {} by {actor}", task.id, worker.name);

        self.notify(
            &worker.actor_id(),
            format!(
                "New task for you:\n{}\n\nSend /begin {} when you start.",
                replies::task_card(&task),
                task.id
            ),
        )
        .await;
        self.reply(actor, &format!("Task #{} assigned to {}.", task.id, worker.name))
            .await;
        Ok(())
    }

    async fn task_draft(&self, actor: &str) -> Result<TaskDraft, DispatchError> {
        match self.load_draft(actor, DraftKind::Task).await? {
            WizardDraft::Task(draft) => Ok(draft),
            _ => Err(DispatchError::CacheMiss(format!("no task draft for {actor}"))),
        }
    }
}
