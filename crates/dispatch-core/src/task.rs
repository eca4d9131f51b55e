//! Task domain model and its status machine.
//!
//! A task moves strictly `pending → in_progress → completed`. The store
//! enforces the same rule inside its transactions; [`TaskStatus::check_transition`]
//! is the single definition both sides agree on.

use crate::error::DispatchError;
use crate::settlement::SettlementMethod;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// System-assigned task identifier.
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The only status this one may advance to. `None` for the terminal status.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Reject anything other than a single forward step.
    pub fn check_transition(self, task_id: TaskId, to: TaskStatus) -> Result<(), DispatchError> {
        if self.next() == Some(to) {
            Ok(())
        } else {
            Err(DispatchError::InvalidTransition {
                task_id,
                from: self,
                to,
            })
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a task takes place: coordinates, a free-text address, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLocation {
    pub point: Option<GeoPoint>,
    pub address: Option<String>,
}

impl TaskLocation {
    pub fn is_empty(&self) -> bool {
        self.point.is_none() && self.address.is_none()
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub location: Option<TaskLocation>,
    /// `None` when the dispatcher left the payment unspecified.
    pub payment_amount: Option<Decimal>,
    /// Worker name.
    pub assigned_to: String,
    /// Dispatcher actor id.
    pub assigned_by: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub completion_report: Option<String>,
    pub completion_media: Option<String>,
    pub received_amount: Decimal,
    pub settlement_method: Option<SettlementMethod>,
}

/// Fields required to create a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub description: String,
    pub location: Option<TaskLocation>,
    pub payment_amount: Option<Decimal>,
    pub assigned_to: String,
    pub assigned_by: String,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.description.trim().is_empty() {
            return Err(DispatchError::Validation(
                "Task description must not be empty.".into(),
            ));
        }
        if self.assigned_to.trim().is_empty() {
            return Err(DispatchError::Validation("A worker must be assigned.".into()));
        }
        if self.assigned_by.trim().is_empty() {
            return Err(DispatchError::Validation(
                "The assigning dispatcher is unknown.".into(),
            ));
        }
        if let Some(amount) = self.payment_amount {
            if amount.is_sign_negative() {
                return Err(DispatchError::Validation(
                    "Payment amount cannot be negative.".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Fields captured by the completion wizard before settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub report: String,
    pub media: Option<String>,
}

/// Filter for task listings. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assigned_to: Option<String>,
    pub statuses: Vec<TaskStatus>,
    /// Only tasks completed at or after this UTC instant.
    pub completed_since: Option<NaiveDateTime>,
    /// Only tasks with a non-zero received amount.
    pub paid_only: bool,
}

impl TaskFilter {
    pub fn for_worker(name: &str) -> Self {
        Self {
            assigned_to: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn open() -> Self {
        Self {
            statuses: vec![TaskStatus::Pending, TaskStatus::InProgress],
            ..Self::default()
        }
    }

    /// Completed tasks, optionally for one worker.
    pub fn completed(worker: Option<&str>) -> Self {
        Self {
            assigned_to: worker.map(str::to_string),
            statuses: vec![TaskStatus::Completed],
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[TaskStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn completed_since(mut self, since: NaiveDateTime) -> Self {
        self.completed_since = Some(since);
        self
    }

    pub fn paid_only(mut self) -> Self {
        self.paid_only = true;
        self
    }
}
