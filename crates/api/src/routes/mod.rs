//! API route definitions.

use axum::{Router, http::Uri, middleware};
use serde::Serialize;

use egabank_shared::AppError;

use crate::error::ApiError;
use crate::{AppState, middleware::auth::auth_middleware};

pub mod accounts;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod statements;
pub mod transactions;

/// Confirmation returned by delete and deactivate endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// What happened.
    pub message: String,
    /// Always true; failures go through the error body.
    pub success: bool,
}

impl MessageResponse {
    /// Builds a success message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(clients::routes())
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(statements::routes())
        .merge(dashboard::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    AppError::not_found("Route", "path", uri.path()).into()
}
