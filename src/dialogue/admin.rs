//! `/login` and `/addworker`.

use super::state::{DialogueState, DraftKind, WizardDraft, WorkerDraft};
use super::{Dialogue, Role};
use dispatch_core::error::DispatchError;
use dispatch_core::input::{parse_chat_id, required_text};
use tracing::{info, warn};

impl Dialogue {
    pub(super) async fn start_login(&self, actor: &str, role: &Role) -> Result<(), DispatchError> {
        if self.access.access_code.is_none() {
            self.reply(actor, "Login is disabled.").await;
            return Ok(());
        }
        if role.is_dispatcher() {
            self.reply(actor, "You are already a dispatcher.").await;
            return Ok(());
        }
        self.advance(actor, &DialogueState::AdminLogin).await
    }

    pub(super) async fn login_code(&self, actor: &str, code: &str) -> Result<(), DispatchError> {
        let Some(expected) = self.access.access_code.as_deref() else {
            self.clear(actor).await?;
            self.reply(actor, "Login is disabled.").await;
            return Ok(());
        };
        if code.trim() != expected {
            warn!("wrong access code from {actor}");
            return Err(DispatchError::Validation("Wrong code.".into()));
        }
        self.store.grant_dispatcher(actor).await?;
        self.clear(actor).await?;
        info!("{actor} logged in as dispatcher");
        self.reply(actor, "Welcome, dispatcher. Send /help to see your commands.")
            .await;
        Ok(())
    }

    pub(super) async fn start_add_worker(&self, actor: &str, role: &Role) -> Result<(), DispatchError> {
        role.require_dispatcher()?;
        self.save_draft(actor, &WizardDraft::Worker(WorkerDraft::default()))
            .await?;
        self.advance(actor, &DialogueState::AddWorkerName).await
    }

    pub(super) async fn add_worker_name(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let name = required_text(text, "The name")?;
        if self.store.find_worker(&name).await?.is_some() {
            return Err(DispatchError::Validation(format!(
                "A worker named '{name}' already exists."
            )));
        }
        self.load_draft(actor, DraftKind::Worker).await?;
        self.save_draft(actor, &WizardDraft::Worker(WorkerDraft { name: Some(name) }))
            .await?;
        self.advance(actor, &DialogueState::AddWorkerChatId).await
    }

    pub(super) async fn add_worker_chat_id(&self, actor: &str, text: &str) -> Result<(), DispatchError> {
        let chat_id = parse_chat_id(text)?;
        let name = match self.load_draft(actor, DraftKind::Worker).await? {
            WizardDraft::Worker(WorkerDraft { name: Some(name) }) => name,
            _ => {
                return Err(DispatchError::CacheMiss(format!(
                    "worker draft for {actor} has no name"
                )))
            }
        };
        let worker = self.store.add_worker(&name, chat_id).await?;
        self.clear(actor).await?;
        info!("{actor} added worker {} ({})", worker.name, worker.chat_id);

        self.notify(
            &worker.actor_id(),
            format!(
                "Hello, {}. You were added as a worker. Send /help to see your commands.",
                worker.name
            ),
        )
        .await;
        self.reply(actor, &format!("Worker {} added.", worker.name))
            .await;
        Ok(())
    }
}
