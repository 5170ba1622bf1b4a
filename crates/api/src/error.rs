//! Error boundary.
//!
//! Handlers return [`ApiError`]. Its `IntoResponse` only sets the status
//! and stashes the error in the response extensions; [`render_errors`],
//! which wraps the whole router, knows the request path and writes the
//! final body:
//!
//! ```json
//! {"timestamp": "...", "status": 404, "error": "Not Found",
//!  "message": "...", "path": "/api/...", "validationErrors": {...}}
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{error, warn};

use egabank_shared::{AppError, FieldErrors};

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An application error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

/// Marker left in the response extensions for [`render_errors`].
#[derive(Debug, Clone)]
struct Failure(Arc<AppError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let mut response = status.into_response();
        response.extensions_mut().insert(Failure(Arc::new(self.0)));
        response
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// When the error was produced.
    pub timestamp: NaiveDateTime,
    /// HTTP status code.
    pub status: u16,
    /// Short error label.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Request path.
    pub path: String,
    /// Per-field messages for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<FieldErrors>,
}

impl ErrorBody {
    /// Builds the body for `error` raised while serving `path`.
    #[must_use]
    pub fn new(error: &AppError, path: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            status: error.status_code(),
            error: error.error_label(),
            message: error.public_message(),
            path: path.into(),
            validation_errors: error.field_errors().cloned(),
        }
    }
}

/// Middleware that turns stashed errors into [`ErrorBody`] responses.
pub async fn render_errors(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<Failure>() {
        Some(Failure(failure)) => {
            (response.status(), Json(ErrorBody::new(&failure, path))).into_response()
        }
        None => response,
    }
}
