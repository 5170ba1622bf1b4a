//! Dashboard routes.

use axum::{Json, Router, extract::State, routing::get};

use egabank_core::dashboard::DashboardStats;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;

/// Creates the dashboard router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(stats))
}

/// GET /dashboard/stats - Totals, scoped to the caller's customer for USER.
async fn stats(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.dashboard.stats(&principal).await?))
}
