use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

use crate::models::Expense;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    #[serde(default)]
    pub description: String,
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: String,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseMessage {
    pub message: &'static str,
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}
