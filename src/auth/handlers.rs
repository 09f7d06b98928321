use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, GoogleLoginRequest, PublicUser},
        jwt::{AuthUser, JwtKeys},
    },
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/google", post(google_login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<GoogleLoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let id_token = payload.id_token.trim();
    if id_token.is_empty() {
        return Err(AppError::bad_request("ID token is required"));
    }

    let identity = state.identity.verify(id_token).await.map_err(|e| {
        warn!(error = %e, "identity verification failed");
        AppError::unauthorized("Authentication failed")
    })?;

    let user = state.store.upsert_user(&identity).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(PublicUser::from(user)))
}
