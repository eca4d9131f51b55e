//! Parsing of free-text wizard answers.

use crate::error::DispatchError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Accepted due-date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a non-negative amount. Spaces, commas and underscores are digit
/// group separators (`50 000`, `50,000`).
pub fn parse_amount(text: &str) -> Result<Decimal, DispatchError> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '_'))
        .collect();

    let amount = Decimal::from_str(&cleaned).map_err(|_| {
        DispatchError::Validation("Please enter a number, for example 50000.".into())
    })?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DispatchError::Validation(
            "The amount cannot be negative.".into(),
        ));
    }
    Ok(amount.normalize())
}

/// Parse an amount that must be strictly positive.
pub fn parse_positive_amount(text: &str) -> Result<Decimal, DispatchError> {
    let amount = parse_amount(text)?;
    if amount.is_zero() {
        return Err(DispatchError::Validation(
            "The amount must be greater than zero.".into(),
        ));
    }
    Ok(amount)
}

/// Parse a due date in `YYYY-MM-DD` or `DD.MM.YYYY` form.
pub fn parse_due_date(text: &str) -> Result<NaiveDate, DispatchError> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| {
            DispatchError::Validation(
                "Please enter a date like 2025-01-15 or 15.01.2025.".into(),
            )
        })
}

/// Parse a chat id (a signed integer, as Telegram uses).
pub fn parse_chat_id(text: &str) -> Result<i64, DispatchError> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| DispatchError::Validation("Please enter a numeric chat id.".into()))
}

/// Whether a reply means "leave this optional field empty".
pub fn is_skip(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "skip" | "-" | "none" | "no"
    )
}

/// Require a non-empty trimmed answer.
pub fn required_text(text: &str, what: &str) -> Result<String, DispatchError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(DispatchError::Validation(format!("{what} must not be empty.")))
    } else {
        Ok(trimmed.to_string())
    }
}
