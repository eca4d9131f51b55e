//! Dialogue engine: loads the actor's state, routes the event, runs the one
//! matching step and records where the actor ends up.
//!
//! Split into focused submodules:
//! - `state`: the closed set of dialogue states and their drafts
//! - `router`: pure `(state, event) → step` selection
//! - `admin`: login and add-worker wizards
//! - `assign`: task assignment wizard
//! - `manual_debt`: dispatcher-entered debts
//! - `completion`: task completion and settlement

mod admin;
mod assign;
mod completion;
mod manual_debt;
pub mod router;
pub mod state;


use crate::commands::{self, Command, CommandContext};
use crate::replies;
use dispatch_core::config::AccessConfig;
use dispatch_core::error::DispatchError;
use dispatch_core::event::{EventKind, InboundEvent, Notification};
use dispatch_core::traits::{Notifier, SessionCache};
use dispatch_memory::store::Worker;
use dispatch_memory::Store;
use router::{route, Route, Step};
use state::{DialogueState, DraftKind, WizardDraft};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What an actor may do.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Dispatcher,
    Worker(Worker),
    Guest,
}

impl Role {
    pub fn is_dispatcher(&self) -> bool {
        matches!(self, Self::Dispatcher)
    }

    pub fn require_dispatcher(&self) -> Result<(), DispatchError> {
        if self.is_dispatcher() {
            Ok(())
        } else {
            Err(DispatchError::NotPermitted("dispatcher only".into()))
        }
    }

    pub fn require_worker(&self) -> Result<&Worker, DispatchError> {
        match self {
            Self::Worker(worker) => Ok(worker),
            _ => Err(DispatchError::NotPermitted("workers only".into())),
        }
    }
}

/// The conversation-driven workflow engine.
pub struct Dialogue {
    store: Store,
    sessions: Arc<dyn SessionCache>,
    notifier: Arc<dyn Notifier>,
    access: AccessConfig,
}

impl Dialogue {
    pub fn new(
        store: Store,
        sessions: Arc<dyn SessionCache>,
        notifier: Arc<dyn Notifier>,
        access: AccessConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            notifier,
            access,
        }
    }

    /// Handle one inbound event. Never fails: every outcome ends in a reply.
    pub async fn handle(&self, event: &InboundEvent) {
        let actor = event.actor_id.as_str();
        debug!("event from {actor}: {}", event.kind.shape());

        let cancelling = matches!(event.kind, EventKind::Cancel);
        let state = match self.load_state(actor, !cancelling).await {
            Ok(state) => state,
            Err(DispatchError::CacheMiss(reason)) => {
                warn!("resetting {actor}: {reason}");
                self.reset_and_reply(actor, replies::SESSION_EXPIRED).await;
                return;
            }
            Err(e) => {
                error!("failed to load state for {actor}: {e}");
                self.reply(actor, replies::TRY_AGAIN).await;
                return;
            }
        };

        let role = match self.role(actor).await {
            Ok(role) => role,
            Err(e) => {
                error!("failed to resolve role for {actor}: {e}");
                self.reply(actor, replies::TRY_AGAIN).await;
                return;
            }
        };

        let route = route(&state, &event.kind);
        debug!("{actor} in '{}' → {route:?}", state.name());

        let result = match route {
            Route::Cancel => self.cancel(actor, &state).await,
            Route::Command(cmd) => self.command(actor, &role, &state, cmd).await,
            Route::Busy => self.busy(actor, &state).await,
            Route::Step(step) => self.step(actor, &role, &state, step).await,
            Route::Unmatched => self.unmatched(actor, &state).await,
        };

        if let Err(e) = result {
            self.recover(actor, &state, e).await;
        }
    }

    /// Resolve the actor's role. Dispatchers win over workers.
    pub async fn role(&self, actor_id: &str) -> Result<Role, DispatchError> {
        if self.access.dispatchers.iter().any(|d| d == actor_id)
            || self.store.is_granted_dispatcher(actor_id).await?
        {
            return Ok(Role::Dispatcher);
        }
        Ok(match self.store.worker_for_actor(actor_id).await? {
            Some(worker) => Role::Worker(worker),
            None => Role::Guest,
        })
    }

    /// Load and decode the actor's state. With `check_draft`, a wizard step
    /// whose session-cache draft is gone is reported as a cache miss.
    async fn load_state(
        &self,
        actor_id: &str,
        check_draft: bool,
    ) -> Result<DialogueState, DispatchError> {
        let Some(record) = self.store.get_actor_state(actor_id).await? else {
            return Ok(DialogueState::Idle);
        };
        let state = DialogueState::from_record(&record.state_name, record.payload.as_deref())?;

        if let Some(kind) = state.draft_kind().filter(|_| check_draft) {
            match self.sessions.load(actor_id).await? {
                Some(raw) => match serde_json::from_str::<WizardDraft>(&raw) {
                    Ok(draft) if draft.kind() == kind => {}
                    _ => {
                        return Err(DispatchError::CacheMiss(format!(
                            "draft for '{}' does not match",
                            state.name()
                        )))
                    }
                },
                None => {
                    return Err(DispatchError::CacheMiss(format!(
                        "no draft for '{}' (durable cache: {})",
                        state.name(),
                        self.sessions.is_durable()
                    )))
                }
            }
        }
        Ok(state)
    }

    async fn command(
        &self,
        actor: &str,
        role: &Role,
        state: &DialogueState,
        cmd: Command,
    ) -> Result<(), DispatchError> {
        match cmd {
            Command::Assign => self.start_assign(actor, role).await,
            Command::AddWorker => self.start_add_worker(actor, role).await,
            Command::AddDebt => self.start_manual_debt(actor, role).await,
            Command::Login => self.start_login(actor, role).await,
            Command::Finish(task_id) => self.start_completion(actor, role, task_id).await,
            Command::Start => {
                if !state.is_idle() {
                    info!("{actor} restarted from '{}'", state.name());
                    self.clear(actor).await?;
                }
                self.run_direct(actor, role, cmd).await
            }
            Command::Help
            | Command::GetId
            | Command::Tasks
            | Command::Begin(_)
            | Command::History { .. }
            | Command::Debts
            | Command::Paid(_)
            | Command::Stats => self.run_direct(actor, role, cmd).await,
        }
    }

    async fn run_direct(&self, actor: &str, role: &Role, cmd: Command) -> Result<(), DispatchError> {
        let ctx = CommandContext {
            store: &self.store,
            notifier: self.notifier.as_ref(),
            actor_id: actor,
            role,
        };
        let reply = commands::handle(cmd, &ctx).await?;
        self.reply(actor, &reply).await;
        Ok(())
    }

    async fn step(
        &self,
        actor: &str,
        role: &Role,
        state: &DialogueState,
        step: Step<'_>,
    ) -> Result<(), DispatchError> {
        let result = match step {
            Step::LoginCode(code) => self.login_code(actor, code).await,
            Step::AddWorkerName(name) => self.add_worker_name(actor, name).await,
            Step::AddWorkerChatId(id) => self.add_worker_chat_id(actor, id).await,
            Step::AssignDescription(text) => self.assign_description(actor, text).await,
            Step::AssignLocation(input) => self.assign_location(actor, input).await,
            Step::AssignPayment(text) => self.assign_payment(actor, text).await,
            Step::AssignWorker(name) => self.assign_worker(actor, name).await,
            Step::DebtSelectDebtor(text) => self.debt_select_debtor(actor, text).await,
            Step::DebtOtherName(person) => self.debt_other_name(actor, person).await,
            Step::DebtAmount(text) => self.debt_amount(actor, text).await,
            Step::DebtReason(text) => self.debt_reason(actor, text).await,
            Step::DebtDueDate(text) => self.debt_due_date(actor, text).await,
            Step::CompleteReport(draft, input) => self.completion_report(actor, draft, input).await,
            Step::CompleteMedia(draft, input) => self.completion_media(actor, draft, input).await,
            Step::CompleteSettlement(draft, text) => {
                self.completion_settlement(actor, draft, text).await
            }
            Step::SettledAmount(draft, method, text) => {
                self.completion_paid(actor, role, draft, method, text).await
            }
            Step::DebtorName(draft, person) => self.completion_debtor(actor, draft, person).await,
            Step::DebtorAmount(draft, text) => {
                self.completion_debt_amount(actor, draft, text).await
            }
            Step::DebtorReason(draft, text) => {
                self.completion_debt_reason(actor, draft, text).await
            }
            Step::DebtorDueDate(draft, text) => {
                self.completion_debt_due(actor, role, draft, text).await
            }
        };
        if let Err(DispatchError::Validation(msg)) = &result {
            debug!("{actor} re-prompted in '{}': {msg}", state.name());
        }
        result
    }

    async fn cancel(&self, actor: &str, state: &DialogueState) -> Result<(), DispatchError> {
        if state.is_idle() {
            self.reply(actor, replies::NOTHING_TO_CANCEL).await;
            return Ok(());
        }
        info!("{actor} cancelled '{}'", state.name());
        self.clear(actor).await?;
        self.reply(actor, replies::CANCELLED).await;
        Ok(())
    }

    async fn busy(&self, actor: &str, state: &DialogueState) -> Result<(), DispatchError> {
        let prompt = self.prompt_text(state).await?;
        self.reply(actor, &format!("{}\n\n{prompt}", replies::BUSY))
            .await;
        Ok(())
    }

    async fn unmatched(&self, actor: &str, state: &DialogueState) -> Result<(), DispatchError> {
        if state.is_idle() {
            self.reply(actor, replies::UNRECOGNIZED).await;
        } else {
            let prompt = self.prompt_text(state).await?;
            self.reply(actor, &format!("{}\n{prompt}", replies::STEP_MISMATCH))
                .await;
        }
        Ok(())
    }

    /// Turn a failed operation into a reply.
    ///
    /// Validation keeps the actor on the same step. Task and permission
    /// errors end the wizard. Store failures leave the state as it was so
    /// the actor can retry.
    async fn recover(&self, actor: &str, state: &DialogueState, err: DispatchError) {
        match err {
            DispatchError::Validation(msg) if state.is_idle() => {
                self.reply(actor, &msg).await;
            }
            DispatchError::Validation(msg) => {
                let prompt = match self.prompt_text(state).await {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("failed to build prompt for {actor}: {e}");
                        String::new()
                    }
                };
                self.reply(actor, format!("{msg}\n{prompt}").trim_end()).await;
            }
            DispatchError::CacheMiss(reason) => {
                warn!("resetting {actor}: {reason}");
                self.reset_and_reply(actor, replies::SESSION_EXPIRED).await;
            }
            e if e.is_recoverable() => {
                info!("{actor}: {e}");
                let text = replies::rejection(&e);
                if state.is_idle() {
                    self.reply(actor, &text).await;
                } else {
                    self.reset_and_reply(actor, &text).await;
                }
            }
            e => {
                error!("operation failed for {actor} in '{}': {e}", state.name());
                self.reply(actor, replies::TRY_AGAIN).await;
            }
        }
    }

    /// Move the actor to `next` and ask its question.
    async fn advance(&self, actor: &str, next: &DialogueState) -> Result<(), DispatchError> {
        let payload = next.payload()?;
        self.store
            .set_actor_state(actor, next.name(), payload.as_deref())
            .await?;
        let prompt = self.prompt_text(next).await?;
        self.reply(actor, &prompt).await;
        Ok(())
    }

    /// Return to idle and drop any draft.
    async fn clear(&self, actor: &str) -> Result<(), DispatchError> {
        self.store.clear_actor_state(actor).await?;
        self.sessions.evict(actor).await
    }

    async fn reset_and_reply(&self, actor: &str, text: &str) {
        if let Err(e) = self.clear(actor).await {
            error!("failed to reset {actor}: {e}");
        }
        self.reply(actor, text).await;
    }

    async fn prompt_text(&self, state: &DialogueState) -> Result<String, DispatchError> {
        let workers = match state {
            DialogueState::AssignWorker | DialogueState::DebtSelectDebtor => {
                self.store.list_workers().await?
            }
            _ => Vec::new(),
        };
        Ok(replies::prompt(state, &workers))
    }

    async fn load_draft(&self, actor: &str, kind: DraftKind) -> Result<WizardDraft, DispatchError> {
        let raw = self
            .sessions
            .load(actor)
            .await?
            .ok_or_else(|| DispatchError::CacheMiss(format!("no draft for {actor}")))?;
        match serde_json::from_str::<WizardDraft>(&raw) {
            Ok(draft) if draft.kind() == kind => Ok(draft),
            _ => Err(DispatchError::CacheMiss(format!(
                "unusable draft for {actor}"
            ))),
        }
    }

    async fn save_draft(&self, actor: &str, draft: &WizardDraft) -> Result<(), DispatchError> {
        let raw = serde_json::to_string(draft)?;
        self.sessions.save(actor, &raw).await
    }

    /// Send a reply to the actor. Delivery failures are logged, not raised.
    async fn reply(&self, actor: &str, text: &str) {
        self.notify(actor, text.to_string()).await;
    }

    async fn notify(&self, actor: &str, content: String) {
        let notification = Notification::new(actor, content);
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("failed to notify {actor}: {e}");
        }
    }
}
