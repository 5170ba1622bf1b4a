//! Authentication routes for register, login, and token refresh.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use egabank_shared::auth::{AuthResponse, LoginRequest, RefreshQuery, RegisterRequest};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{Params, Payload};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// POST /auth/register - Create a USER principal and its customer.
async fn register(
    State(state): State<AppState>,
    Payload(payload): Payload<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Authenticate and return tokens.
async fn login(
    State(state): State<AppState>,
    Payload(payload): Payload<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.login(payload).await?))
}

/// POST /auth/refresh?refreshToken= - Exchange a refresh token.
async fn refresh(
    State(state): State<AppState>,
    Params(query): Params<RefreshQuery>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.refresh(&query.refresh_token).await?))
}
