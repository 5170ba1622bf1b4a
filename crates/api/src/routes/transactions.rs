//! Ledger routes: deposits, withdrawals, transfers and history.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use egabank_core::ledger::{EntryKind, LedgerEntry, OperationInput, Period, PeriodQuery, TransferInput};
use egabank_shared::types::LedgerEntryId;
use egabank_shared::types::money::to_money_scale;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{Params, PathParam, Payload};
use crate::middleware::auth::AuthUser;

/// Creates the transaction router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/transfer", post(transfer))
        .route("/transactions/{identifier}", get(account_transactions))
        .route("/transactions/{identifier}/deposit", post(deposit))
        .route("/transactions/{identifier}/withdraw", post(withdraw))
        .route("/transactions/{identifier}/history", get(history))
}

/// Ledger entry as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Entry ID.
    pub id: LedgerEntryId,
    /// Movement kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Movement label.
    pub type_label: &'static str,
    /// Amount moved.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    /// When the movement happened.
    pub occurred_at: NaiveDateTime,
    /// Description.
    pub description: String,
    /// Other side of a transfer.
    pub counterparty: Option<String>,
    /// Balance before.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance_before: Decimal,
    /// Balance after.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance_after: Decimal,
    /// Owning account identifier.
    pub account_identifier: String,
}

impl From<LedgerEntry> for TransactionResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            type_label: entry.kind.label(),
            amount: to_money_scale(entry.amount),
            occurred_at: entry.occurred_at,
            description: entry.description,
            counterparty: entry.counterparty,
            balance_before: to_money_scale(entry.balance_before),
            balance_after: to_money_scale(entry.balance_after),
            account_identifier: entry.account_identifier,
        }
    }
}

fn respond_all(entries: Vec<LedgerEntry>) -> Json<Vec<TransactionResponse>> {
    Json(entries.into_iter().map(TransactionResponse::from).collect())
}

/// POST /transactions/{identifier}/deposit
async fn deposit(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
    Payload(input): Payload<OperationInput>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let entry = state.engine.deposit(&principal, &identifier, input).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST /transactions/{identifier}/withdraw
async fn withdraw(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
    Payload(input): Payload<OperationInput>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let entry = state.engine.withdraw(&principal, &identifier, input).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST /transactions/transfer - Returns the debit leg.
async fn transfer(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Payload(input): Payload<TransferInput>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let entry = state.engine.transfer(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// GET /transactions - Every visible entry, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let entries = state.engine.all(&principal).await?;
    info!(username = %principal.username, count = entries.len(), "listed transactions");
    Ok(respond_all(entries))
}

/// GET /transactions/{identifier}
async fn account_transactions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    Ok(respond_all(state.engine.all_by_account(&principal, &identifier).await?))
}

/// GET /transactions/{identifier}/history?debut=&fin= - Both days included.
async fn history(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
    Params(query): Params<PeriodQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let period = Period::try_from(query)?;
    Ok(respond_all(state.engine.history(&principal, &identifier, period).await?))
}
