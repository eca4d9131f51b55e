//! The closed set of dialogue states and the drafts they carry.
//!
//! A state is persisted as `(state_name, state_payload)`. Completion states
//! keep their draft in the payload, so they survive restarts on their own.
//! Assign, add-worker and manual-debt states keep their draft in the
//! session cache instead, keyed by actor id.

use dispatch_core::error::DispatchError;
use dispatch_core::task::{TaskId, TaskLocation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where an actor is in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueState {
    Idle,
    AdminLogin,
    AssignDescription,
    AssignLocation,
    AssignPayment,
    AssignWorker,
    AddWorkerName,
    AddWorkerChatId,
    DebtSelectDebtor,
    DebtOtherName,
    DebtAmount,
    DebtReason,
    DebtDueDate,
    CompleteReport(CompletionDraft),
    CompleteMedia(CompletionDraft),
    CompleteSettlement(CompletionDraft),
    CashAmount(CompletionDraft),
    CardAmount(CompletionDraft),
    DebtorName(CompletionDraft),
    DebtorAmount(CompletionDraft),
    DebtorReason(CompletionDraft),
    DebtorDueDate(CompletionDraft),
}

/// Which session-cache draft a state depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    Task,
    Worker,
    Debt,
}

impl DialogueState {
    /// Stable persisted name. Idle is the empty string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::AdminLogin => "admin_login",
            Self::AssignDescription => "assign_task_description",
            Self::AssignLocation => "assign_task_location",
            Self::AssignPayment => "assign_task_payment",
            Self::AssignWorker => "assign_task_employee",
            Self::AddWorkerName => "add_employee_name",
            Self::AddWorkerChatId => "add_employee_id",
            Self::DebtSelectDebtor => "select_debt_employee",
            Self::DebtOtherName => "other_debt_name",
            Self::DebtAmount => "manual_debt_amount",
            Self::DebtReason => "manual_debt_reason",
            Self::DebtDueDate => "manual_debt_date",
            Self::CompleteReport(_) => "complete_task_report",
            Self::CompleteMedia(_) => "complete_task_media",
            Self::CompleteSettlement(_) => "complete_task_payment",
            Self::CashAmount(_) => "cash_payment_amount",
            Self::CardAmount(_) => "card_payment_amount",
            Self::DebtorName(_) => "debt_person_name",
            Self::DebtorAmount(_) => "debt_amount",
            Self::DebtorReason(_) => "debt_reason",
            Self::DebtorDueDate(_) => "debt_payment_date",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The completion draft carried in the payload, if any.
    pub fn completion(&self) -> Option<&CompletionDraft> {
        match self {
            Self::CompleteReport(d)
            | Self::CompleteMedia(d)
            | Self::CompleteSettlement(d)
            | Self::CashAmount(d)
            | Self::CardAmount(d)
            | Self::DebtorName(d)
            | Self::DebtorAmount(d)
            | Self::DebtorReason(d)
            | Self::DebtorDueDate(d) => Some(d),
            _ => None,
        }
    }

    /// The session-cache draft this state needs.
    pub fn draft_kind(&self) -> Option<DraftKind> {
        match self {
            Self::AssignDescription
            | Self::AssignLocation
            | Self::AssignPayment
            | Self::AssignWorker => Some(DraftKind::Task),
            Self::AddWorkerName | Self::AddWorkerChatId => Some(DraftKind::Worker),
            Self::DebtSelectDebtor
            | Self::DebtOtherName
            | Self::DebtAmount
            | Self::DebtReason
            | Self::DebtDueDate => Some(DraftKind::Debt),
            _ => None,
        }
    }

    /// Serialized payload for the store.
    pub fn payload(&self) -> Result<Option<String>, DispatchError> {
        self.completion()
            .map(serde_json::to_string)
            .transpose()
            .map_err(DispatchError::from)
    }

    /// Rebuild a state from its persisted form.
    ///
    /// Unknown names and undecodable payloads are reported as
    /// [`DispatchError::CacheMiss`]: the conversation cannot continue and
    /// the actor must start over.
    pub fn from_record(name: &str, payload: Option<&str>) -> Result<Self, DispatchError> {
        let simple = match name {
            "" => Some(Self::Idle),
            "admin_login" => Some(Self::AdminLogin),
            "assign_task_description" => Some(Self::AssignDescription),
            "assign_task_location" => Some(Self::AssignLocation),
            "assign_task_payment" => Some(Self::AssignPayment),
            "assign_task_employee" => Some(Self::AssignWorker),
            "add_employee_name" => Some(Self::AddWorkerName),
            "add_employee_id" => Some(Self::AddWorkerChatId),
            "select_debt_employee" => Some(Self::DebtSelectDebtor),
            "other_debt_name" => Some(Self::DebtOtherName),
            "manual_debt_amount" => Some(Self::DebtAmount),
            "manual_debt_reason" => Some(Self::DebtReason),
            "manual_debt_date" => Some(Self::DebtDueDate),
            _ => None,
        };
        if let Some(state) = simple {
            return Ok(state);
        }

        let with_draft: fn(CompletionDraft) -> Self = match name {
            "complete_task_report" => Self::CompleteReport,
            "complete_task_media" => Self::CompleteMedia,
            "complete_task_payment" => Self::CompleteSettlement,
            "cash_payment_amount" => Self::CashAmount,
            "card_payment_amount" => Self::CardAmount,
            "debt_person_name" => Self::DebtorName,
            "debt_amount" => Self::DebtorAmount,
            "debt_reason" => Self::DebtorReason,
            "debt_payment_date" => Self::DebtorDueDate,
            other => {
                return Err(DispatchError::CacheMiss(format!(
                    "unknown dialogue state '{other}'"
                )))
            }
        };
        let payload = payload
            .ok_or_else(|| DispatchError::CacheMiss(format!("state '{name}' has no payload")))?;
        let draft: CompletionDraft = serde_json::from_str(payload).map_err(|e| {
            DispatchError::CacheMiss(format!("state '{name}' has a bad payload: {e}"))
        })?;
        Ok(with_draft(draft))
    }
}

/// Completion wizard progress, carried in the state payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionDraft {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// `None` past the debtor step means the worker owes it themself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debtor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debtor_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_reason: Option<String>,
}

impl CompletionDraft {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            ..Self::default()
        }
    }
}

/// Session-cache drafts, one per wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "wizard", rename_all = "snake_case")]
pub enum WizardDraft {
    Task(TaskDraft),
    Worker(WorkerDraft),
    Debt(DebtDraft),
}

impl WizardDraft {
    pub fn kind(&self) -> DraftKind {
        match self {
            Self::Task(_) => DraftKind::Task,
            Self::Worker(_) => DraftKind::Worker,
            Self::Debt(_) => DraftKind::Debt,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub description: Option<String>,
    pub location: Option<TaskLocation>,
    pub payment_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerDraft {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebtDraft {
    pub debtor_name: Option<String>,
    pub debtor_contact: Option<String>,
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
}
