//! Debt records: created manually by a dispatcher or by a task settled on credit.

use crate::error::DispatchError;
use crate::task::TaskId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DebtId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Unpaid,
    Paid,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(Self::Unpaid),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub id: DebtId,
    pub debtor_name: String,
    /// Actor id or phone number; absent for third parties we cannot reach.
    pub debtor_contact: Option<String>,
    /// Set when the debt came out of a task settlement.
    pub task_id: Option<TaskId>,
    pub amount: Decimal,
    pub reason: String,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    pub status: DebtStatus,
    pub created_at: String,
    pub paid_at: Option<String>,
}

/// Fields required to create a debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDebt {
    pub debtor_name: String,
    pub debtor_contact: Option<String>,
    pub task_id: Option<TaskId>,
    pub amount: Decimal,
    pub reason: String,
    pub due_date: NaiveDate,
}

impl NewDebt {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.debtor_name.trim().is_empty() {
            return Err(DispatchError::Validation(
                "Debtor name must not be empty.".into(),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(DispatchError::Validation(
                "Debt amount must be greater than zero.".into(),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(DispatchError::Validation(
                "Debt reason must not be empty.".into(),
            ));
        }
        Ok(())
    }
}

/// Filter for debt listings.
#[derive(Debug, Clone, Default)]
pub struct DebtFilter {
    pub debtor_name: Option<String>,
    pub status: Option<DebtStatus>,
}

impl DebtFilter {
    pub fn unpaid() -> Self {
        Self {
            debtor_name: None,
            status: Some(DebtStatus::Unpaid),
        }
    }

    pub fn unpaid_for(debtor_name: &str) -> Self {
        Self {
            debtor_name: Some(debtor_name.to_string()),
            status: Some(DebtStatus::Unpaid),
        }
    }
}
