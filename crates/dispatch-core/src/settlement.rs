//! Payment/debt resolution for completed tasks.
//!
//! A completion always resolves to exactly one [`SettlementOutcome`]:
//! cash and card record the received amount, debt records zero and carries
//! the [`NewDebt`] that must be written in the same transaction as the
//! status change.

use crate::debt::NewDebt;
use crate::error::DispatchError;
use crate::task::TaskId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    Cash,
    Card,
    Debt,
}

impl SettlementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Debt => "debt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "debt" => Some(Self::Debt),
            _ => None,
        }
    }

    /// Parse a worker's reply to the settlement prompt: the keyword or its
    /// menu number (1 cash, 2 card, 3 debt).
    pub fn from_choice(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "1" | "cash" => Some(Self::Cash),
            "2" | "card" => Some(Self::Card),
            "3" | "debt" | "credit" => Some(Self::Debt),
            _ => None,
        }
    }
}

impl fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terms of a debt collected by the completion wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTerms {
    /// `None` means the worker themself owes the amount.
    pub debtor_name: Option<String>,
    pub debtor_contact: Option<String>,
    pub amount: Decimal,
    pub reason: String,
    pub due_date: NaiveDate,
}

/// The settlement a worker chose for a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Settlement {
    Cash { amount: Decimal },
    Card { amount: Decimal },
    Debt(DebtTerms),
}

/// The resolved financial effect of a settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    pub method: SettlementMethod,
    pub received_amount: Decimal,
    pub debt: Option<NewDebt>,
}

/// Who completed the task; the default debtor for debt settlements.
#[derive(Debug, Clone, Copy)]
pub struct Settler<'a> {
    pub name: &'a str,
    pub contact: Option<&'a str>,
}

impl Settlement {
    pub fn method(&self) -> SettlementMethod {
        match self {
            Self::Cash { .. } => SettlementMethod::Cash,
            Self::Card { .. } => SettlementMethod::Card,
            Self::Debt(_) => SettlementMethod::Debt,
        }
    }

    /// Resolve into the values written alongside the task completion.
    pub fn resolve(
        &self,
        task_id: TaskId,
        settler: Settler<'_>,
    ) -> Result<SettlementOutcome, DispatchError> {
        match self {
            Self::Cash { amount } | Self::Card { amount } => {
                if amount.is_sign_negative() {
                    return Err(DispatchError::Validation(
                        "The received amount cannot be negative.".into(),
                    ));
                }
                Ok(SettlementOutcome {
                    method: self.method(),
                    received_amount: *amount,
                    debt: None,
                })
            }
            Self::Debt(terms) => {
                let (debtor_name, debtor_contact) = match &terms.debtor_name {
                    Some(name) if !name.trim().is_empty() => {
                        (name.trim().to_string(), terms.debtor_contact.clone())
                    }
                    _ => (
                        settler.name.to_string(),
                        settler.contact.map(str::to_string),
                    ),
                };
                let debt = NewDebt {
                    debtor_name,
                    debtor_contact,
                    task_id: Some(task_id),
                    amount: terms.amount,
                    reason: terms.reason.trim().to_string(),
                    due_date: terms.due_date,
                };
                debt.validate()?;
                Ok(SettlementOutcome {
                    method: SettlementMethod::Debt,
                    received_amount: Decimal::ZERO,
                    debt: Some(debt),
                })
            }
        }
    }
}
