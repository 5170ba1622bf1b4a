//! Customer routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use egabank_core::customer::{Customer, CustomerDetails, CustomerInput, CustomerSummary, Sex};
use egabank_shared::types::{CustomerId, PageRequest, PageResponse};

use super::MessageResponse;
use super::accounts::AccountResponse;
use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{Params, PathParam, Payload};
use crate::middleware::auth::AuthUser;

/// Creates the customer router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/search", get(search_clients))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/clients/{id}/details", get(get_client_details))
}

/// Customer as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    /// Customer ID.
    pub id: CustomerId,
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// "Given Family".
    pub full_name: String,
    /// Birth date.
    pub birth_date: NaiveDate,
    /// Sex.
    pub sex: Sex,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Nationality.
    pub nationality: Option<String>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Number of owned accounts.
    pub account_count: usize,
    /// Owned accounts, only on the details endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<AccountResponse>>,
}

impl ClientResponse {
    fn new(customer: Customer, account_count: usize) -> Self {
        Self {
            id: customer.id,
            full_name: customer.full_name(),
            family_name: customer.family_name,
            given_name: customer.given_name,
            birth_date: customer.birth_date,
            sex: customer.sex,
            address: customer.address,
            phone: customer.phone,
            email: customer.email,
            nationality: customer.nationality,
            created_at: customer.created_at,
            account_count,
            accounts: None,
        }
    }
}

impl From<CustomerSummary> for ClientResponse {
    fn from(summary: CustomerSummary) -> Self {
        Self::new(summary.customer, summary.account_count)
    }
}

impl From<CustomerDetails> for ClientResponse {
    fn from(details: CustomerDetails) -> Self {
        let owner_name = details.customer.full_name();
        let accounts = details
            .accounts
            .iter()
            .map(|account| AccountResponse::new(account, &owner_name))
            .collect::<Vec<_>>();
        Self {
            accounts: Some(accounts),
            ..Self::new(details.customer, details.accounts.len())
        }
    }
}

/// Search term; paging comes from a separate `PageRequest`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Matched against family name, given name and email.
    pub q: String,
}

/// GET /clients - Page through all customers (ADMIN).
async fn list_clients(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Params(paging): Params<PageRequest>,
) -> ApiResult<Json<PageResponse<ClientResponse>>> {
    let page = state.customers.list(&principal, paging.clamped()).await?;
    Ok(Json(page.map(ClientResponse::from)))
}

/// GET /clients/search?q= - Case-insensitive search (ADMIN).
async fn search_clients(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Params(query): Params<SearchQuery>,
    Params(paging): Params<PageRequest>,
) -> ApiResult<Json<PageResponse<ClientResponse>>> {
    let page = state
        .customers
        .search(&principal, &query.q, paging.clamped())
        .await?;
    Ok(Json(page.map(ClientResponse::from)))
}

/// GET /clients/{id}
async fn get_client(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<CustomerId>,
) -> ApiResult<Json<ClientResponse>> {
    Ok(Json(state.customers.get(&principal, id).await?.into()))
}

/// GET /clients/{id}/details - Customer with its accounts.
async fn get_client_details(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<CustomerId>,
) -> ApiResult<Json<ClientResponse>> {
    Ok(Json(state.customers.get_with_accounts(&principal, id).await?.into()))
}

/// POST /clients (ADMIN)
async fn create_client(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Payload(input): Payload<CustomerInput>,
) -> ApiResult<(StatusCode, Json<ClientResponse>)> {
    let created = state.customers.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// PUT /clients/{id}
async fn update_client(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<CustomerId>,
    Payload(input): Payload<CustomerInput>,
) -> ApiResult<Json<ClientResponse>> {
    Ok(Json(state.customers.update(&principal, id, input).await?.into()))
}

/// DELETE /clients/{id} (ADMIN) - Cascades to accounts, ledger and principal.
async fn delete_client(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    PathParam(id): PathParam<CustomerId>,
) -> ApiResult<Json<MessageResponse>> {
    state.customers.delete(&principal, id).await?;
    Ok(Json(MessageResponse::success("Customer deleted successfully")))
}
