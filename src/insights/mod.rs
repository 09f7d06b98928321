//! Derived views over a user's expenses and savings.
//!
//! - [`score`]: composite financial health score and its sub-factors
//! - [`notifications`]: due-soon reminders, overdue alerts, savings tip
//! - [`analytics`]: monthly and per-category totals
//!
//! The computations are pure and take the reference time as an argument;
//! [`handlers`] reads the snapshot from the store and supplies the clock.

pub mod analytics;
pub mod handlers;
pub mod notifications;
pub mod score;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::insight_routes()
}
