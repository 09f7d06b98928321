//! Financial health score.
//!
//! The score is the sum of three positive sub-factors minus an overdue
//! penalty, floored at zero:
//!
//! | factor                     | max |
//! |----------------------------|-----|
//! | bill payment consistency   | 30  |
//! | savings discipline         | 25  |
//! | cash flow management       | 25  |
//! | overdue bills (subtracted) | 20  |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Expense, Saving};

pub const BILL_PAYMENT_MAX: u32 = 30;
pub const SAVINGS_DISCIPLINE_MAX: u32 = 25;
pub const CASH_FLOW_MAX: u32 = 25;
pub const OVERDUE_PENALTY_MAX: u32 = 20;
pub const OVERDUE_PENALTY_PER_BILL: u32 = 5;

/// Savings units per discipline point.
const SAVINGS_PER_POINT: f64 = 100.0;
const CASH_FLOW_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactors {
    pub bill_payment_consistency: u32,
    pub savings_discipline: u32,
    pub cash_flow_management: u32,
    pub overdue_bills: u32,
}

impl ScoreFactors {
    pub fn total(&self) -> u32 {
        (self.bill_payment_consistency + self.savings_discipline + self.cash_flow_management)
            .saturating_sub(self.overdue_bills)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub score: u32,
    pub factors: ScoreFactors,
}

impl ScoreReport {
    /// Score reported when there is nothing to score or the input is unusable.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Input the engine refuses to score.
#[derive(Debug, Error, PartialEq)]
pub enum ComputationError {
    #[error("expense {id} has invalid amount {amount}")]
    InvalidExpenseAmount { id: Uuid, amount: f64 },

    #[error("saving {id} has invalid amount {amount}")]
    InvalidSavingAmount { id: Uuid, amount: f64 },

    #[error("expense {id} paid flag and paid date disagree")]
    InconsistentPaidState { id: Uuid },
}

/// Computes the score of one user's records as of `now`.
///
/// `now` only affects the overdue penalty. Returns [`ComputationError`]
/// instead of guessing when a record breaks the data model invariants.
pub fn compute_score(
    expenses: &[Expense],
    savings: &[Saving],
    now: OffsetDateTime,
) -> Result<ScoreReport, ComputationError> {
    validate(expenses, savings)?;

    if expenses.is_empty() && savings.is_empty() {
        return Ok(ScoreReport::zero());
    }

    let total_savings = sum_savings(savings);
    let total_expenses = sum_expenses(expenses);

    let factors = ScoreFactors {
        bill_payment_consistency: bill_payment_consistency(expenses),
        savings_discipline: savings_discipline(total_savings),
        cash_flow_management: cash_flow_management(total_savings, total_expenses),
        overdue_bills: overdue_penalty(expenses, now),
    };

    Ok(ScoreReport {
        score: factors.total(),
        factors,
    })
}

fn validate(expenses: &[Expense], savings: &[Saving]) -> Result<(), ComputationError> {
    for e in expenses {
        if !is_valid_amount(e.amount) {
            return Err(ComputationError::InvalidExpenseAmount {
                id: e.id,
                amount: e.amount,
            });
        }
        if e.is_paid != e.paid_date.is_some() {
            return Err(ComputationError::InconsistentPaidState { id: e.id });
        }
    }
    for s in savings {
        if !is_valid_amount(s.amount) {
            return Err(ComputationError::InvalidSavingAmount {
                id: s.id,
                amount: s.amount,
            });
        }
    }
    Ok(())
}

pub(crate) fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}

pub(crate) fn sum_expenses(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

pub(crate) fn sum_savings(savings: &[Saving]) -> f64 {
    savings.iter().map(|s| s.amount).sum()
}

/// Half-up rounding for non-negative values (2.5 -> 3).
pub(crate) fn round_half_up(value: f64) -> u32 {
    // `as` saturates, so huge totals clamp instead of wrapping
    (value + 0.5).floor() as u32
}

fn bill_payment_consistency(expenses: &[Expense]) -> u32 {
    let with_due_date = expenses.iter().filter(|e| e.due_date.is_some()).count();
    let paid_on_time = expenses
        .iter()
        .filter(|e| match (e.due_date, e.paid_date) {
            (Some(due), Some(paid)) => e.is_paid && paid <= due,
            _ => false,
        })
        .count();
    let paid_without_due_date = expenses
        .iter()
        .filter(|e| e.due_date.is_none() && e.is_paid)
        .count();

    if with_due_date > 0 {
        let ratio = (paid_on_time + paid_without_due_date) as f64 / expenses.len() as f64;
        round_half_up(ratio * BILL_PAYMENT_MAX as f64)
    } else if paid_without_due_date > 0 {
        // nothing to measure timeliness against
        BILL_PAYMENT_MAX
    } else {
        0
    }
}

fn savings_discipline(total_savings: f64) -> u32 {
    round_half_up(total_savings / SAVINGS_PER_POINT).min(SAVINGS_DISCIPLINE_MAX)
}

fn cash_flow_management(total_savings: f64, total_expenses: f64) -> u32 {
    let ratio = total_savings / total_expenses.max(1.0);
    round_half_up(ratio * CASH_FLOW_MULTIPLIER).min(CASH_FLOW_MAX)
}

fn overdue_penalty(expenses: &[Expense], now: OffsetDateTime) -> u32 {
    let overdue = expenses.iter().filter(|e| e.is_overdue(now)).count() as u32;
    overdue
        .saturating_mul(OVERDUE_PENALTY_PER_BILL)
        .min(OVERDUE_PENALTY_MAX)
}
