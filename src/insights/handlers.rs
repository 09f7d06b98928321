use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    analytics::{compute_analytics, Analytics},
    notifications::{compute_notifications, Notification},
    score::{compute_score, sum_expenses, sum_savings, ScoreFactors, ScoreReport},
};
use crate::{
    auth::jwt::AuthUser,
    error::AppResult,
    models::{Expense, Saving, ScoreRecord, Snapshot},
    state::AppState,
};

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub samarthan_score: u32,
    pub score_factors: ScoreFactors,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub samarthan_score: u32,
    pub score_factors: ScoreFactors,
    pub recent_expenses: Vec<Expense>,
    pub recent_savings: Vec<Saving>,
    pub total_expenses: f64,
    pub total_savings: f64,
    /// When the score was last recorded; null until the score route is hit.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

pub fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/samarthan-score", get(get_score))
        .route("/dashboard", get(get_dashboard))
        .route("/analytics", get(get_analytics))
        .route("/notifications", get(get_notifications))
}

/// Scores a snapshot, falling back to the zero score when the engine
/// refuses the input. The fallback keeps the score endpoints available.
fn score_or_zero(user_id: Uuid, snapshot: &Snapshot, now: OffsetDateTime) -> ScoreReport {
    compute_score(&snapshot.expenses, &snapshot.savings, now).unwrap_or_else(|e| {
        warn!(%user_id, error = %e, "score computation failed; reporting zero");
        ScoreReport::zero()
    })
}

#[instrument(skip(state))]
pub async fn get_score(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ScoreResponse>> {
    let snapshot = state.store.snapshot(user_id).await?;
    let now = OffsetDateTime::now_utc();
    let report = score_or_zero(user_id, &snapshot, now);

    state
        .store
        .save_score(ScoreRecord {
            user_id,
            score: report.score,
            factors: report.factors,
            last_updated: now,
        })
        .await?;
    debug!(%user_id, score = report.score, "score recorded");

    Ok(Json(ScoreResponse {
        samarthan_score: report.score,
        score_factors: report.factors,
        last_updated: now,
    }))
}

#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DashboardResponse>> {
    let snapshot = state.store.snapshot(user_id).await?;
    let report = score_or_zero(user_id, &snapshot, OffsetDateTime::now_utc());
    let last_updated = state
        .store
        .last_score(user_id)
        .await?
        .map(|record| record.last_updated);

    let total_expenses = sum_expenses(&snapshot.expenses);
    let total_savings = sum_savings(&snapshot.savings);
    let Snapshot { expenses, savings } = snapshot;

    Ok(Json(DashboardResponse {
        samarthan_score: report.score,
        score_factors: report.factors,
        recent_expenses: expenses.into_iter().rev().take(RECENT_LIMIT).collect(),
        recent_savings: savings.into_iter().rev().take(RECENT_LIMIT).collect(),
        total_expenses,
        total_savings,
        last_updated,
    }))
}

#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Analytics>> {
    let snapshot = state.store.snapshot(user_id).await?;
    Ok(Json(compute_analytics(&snapshot.expenses, &snapshot.savings)))
}

#[instrument(skip(state))]
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Notification>>> {
    let snapshot = state.store.snapshot(user_id).await?;
    let now = OffsetDateTime::now_utc();
    Ok(Json(compute_notifications(
        &snapshot.expenses,
        &snapshot.savings,
        now,
    )))
}
