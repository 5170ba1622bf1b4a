//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api`
//! - Bearer authentication middleware
//! - Request extractors that report malformed input as validation errors
//! - The error boundary that renders every failure as one JSON shape

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use egabank_core::account::AccountService;
use egabank_core::auth::AuthService;
use egabank_core::customer::CustomerService;
use egabank_core::dashboard::DashboardService;
use egabank_core::ledger::TransactionEngine;
use egabank_core::statement::StatementService;
use egabank_core::store::Store;
use egabank_shared::jwt::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registration, login and bearer authentication.
    pub auth: Arc<AuthService>,
    /// Customer management.
    pub customers: Arc<CustomerService>,
    /// Account management.
    pub accounts: Arc<AccountService>,
    /// Deposits, withdrawals, transfers and ledger queries.
    pub engine: Arc<TransactionEngine>,
    /// PDF statements.
    pub statements: Arc<StatementService>,
    /// Aggregate figures.
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wires every service onto one store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, jwt: Arc<JwtService>) -> Self {
        Self {
            auth: Arc::new(AuthService::new(Arc::clone(&store), jwt)),
            customers: Arc::new(CustomerService::new(Arc::clone(&store))),
            accounts: Arc::new(AccountService::new(Arc::clone(&store))),
            engine: Arc::new(TransactionEngine::new(Arc::clone(&store))),
            statements: Arc::new(StatementService::new(Arc::clone(&store))),
            dashboard: Arc::new(DashboardService::new(store)),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn(error::render_errors))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
