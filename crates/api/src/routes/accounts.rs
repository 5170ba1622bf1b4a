//! Account routes.
//!
//! `/accounts/{id}` is shared: GET reads it as the account identifier,
//! DELETE as the numeric account ID.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use egabank_core::account::{Account, AccountKind, OpenAccountInput, OwnedAccount, format_identifier};
use egabank_shared::types::money::to_money_scale;
use egabank_shared::types::{AccountId, CustomerId, PageRequest, PageResponse};

use super::MessageResponse;
use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{Params, PathParam, Payload};
use crate::middleware::auth::AuthUser;

/// Creates the account router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account).delete(delete_account))
        .route("/accounts/client/{client_id}", get(list_client_accounts))
        .route("/accounts/{id}/deactivate", put(deactivate_account))
}

/// Account as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Account identifier.
    pub identifier: String,
    /// Identifier in groups of four.
    pub formatted_identifier: String,
    /// Product.
    #[serde(rename = "type")]
    pub kind: AccountKind,
    /// Product label.
    pub type_label: &'static str,
    /// Opening timestamp.
    pub created_at: NaiveDateTime,
    /// Current balance.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance: Decimal,
    /// Whether the account accepts operations.
    pub active: bool,
    /// Owning customer.
    pub client_id: CustomerId,
    /// Owner full name.
    pub client_full_name: String,
}

impl AccountResponse {
    /// Builds the response for an account owned by `owner_name`.
    #[must_use]
    pub fn new(account: &Account, owner_name: &str) -> Self {
        Self {
            id: account.id,
            identifier: account.identifier.clone(),
            formatted_identifier: format_identifier(&account.identifier),
            kind: account.kind,
            type_label: account.kind.label(),
            created_at: account.created_at,
            balance: to_money_scale(account.balance),
            active: account.active,
            client_id: account.owner,
            client_full_name: owner_name.to_string(),
        }
    }
}

impl From<OwnedAccount> for AccountResponse {
    fn from(owned: OwnedAccount) -> Self {
        Self::new(&owned.account, &owned.owner_name)
    }
}

/// GET /accounts - All accounts for ADMIN, own accounts for USER.
async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Params(paging): Params<PageRequest>,
) -> ApiResult<Json<PageResponse<AccountResponse>>> {
    let page = state.accounts.list(&principal, paging.clamped()).await?;
    Ok(Json(page.map(AccountResponse::from)))
}

/// GET /accounts/{identifier}
async fn get_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(identifier): PathParam<String>,
) -> ApiResult<Json<AccountResponse>> {
    Ok(Json(state.accounts.get(&principal, &identifier).await?.into()))
}

/// GET /accounts/client/{client_id}
async fn list_client_accounts(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(client_id): PathParam<CustomerId>,
) -> ApiResult<Json<Vec<AccountResponse>>> {
    let accounts = state.accounts.list_by_customer(&principal, client_id).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// POST /accounts - Open an account with a fresh identifier.
async fn create_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Payload(input): Payload<OpenAccountInput>,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    let opened = state.accounts.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(opened.into())))
}

/// DELETE /accounts/{id} - Only with a zero balance.
async fn delete_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<AccountId>,
) -> ApiResult<Json<MessageResponse>> {
    state.accounts.delete(&principal, id).await?;
    Ok(Json(MessageResponse::success("Account deleted successfully")))
}

/// PUT /accounts/{id}/deactivate
async fn deactivate_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<AccountId>,
) -> ApiResult<Json<MessageResponse>> {
    state.accounts.deactivate(&principal, id).await?;
    Ok(Json(MessageResponse::success("Account deactivated successfully")))
}
