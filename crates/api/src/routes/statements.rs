//! Statement download.

use axum::{
    Router,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};

use egabank_core::ledger::{Period, PeriodQuery};

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{Params, PathParam};
use crate::middleware::auth::AuthUser;

/// Creates the statement router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/statements/{identifier}", get(download))
}

/// GET /statements/{identifier}?debut=&fin= - PDF attachment.
async fn download(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
    Params(query): Params<PeriodQuery>,
) -> ApiResult<impl IntoResponse> {
    let period = Period::try_from(query)?;
    let statement = state.statements.generate(&principal, &identifier, period).await?;

    let disposition = format!("attachment; filename={}", statement.filename);
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        statement.bytes,
    ))
}
