//! Account service.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use egabank_shared::types::{AccountId, CustomerId, PageRequest, PageResponse};
use egabank_shared::{AppError, AppResult};

use super::identifier::{IdentifierSource, RandomIdentifiers, is_valid_identifier};
use super::types::{Account, NewAccount, OpenAccountInput, OwnedAccount};
use crate::access::{Action, Principal, Scope, Target, ensure, scope};
use crate::store::{Store, StoreTx};

/// Number of identifier candidates tried before giving up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 100;

/// Account service.
pub struct AccountService {
    store: Arc<dyn Store>,
    identifiers: Arc<dyn IdentifierSource>,
}

/// Attaches owner names, looking each owner up once.
async fn with_owners(tx: &mut dyn StoreTx, accounts: Vec<Account>) -> AppResult<Vec<OwnedAccount>> {
    let mut names: BTreeMap<CustomerId, String> = BTreeMap::new();
    let mut owned = Vec::with_capacity(accounts.len());
    for account in accounts {
        let owner_name = match names.get(&account.owner) {
            Some(name) => name.clone(),
            None => {
                let name = tx
                    .find_customer(account.owner)
                    .await?
                    .map(|c| c.full_name())
                    .unwrap_or_default();
                names.insert(account.owner, name.clone());
                name
            }
        };
        owned.push(OwnedAccount {
            account,
            owner_name,
        });
    }
    Ok(owned)
}

/// Loads an account by ID and locks its row.
async fn lock_by_id(tx: &mut dyn StoreTx, id: AccountId) -> AppResult<Account> {
    let identifier = tx
        .find_account(id)
        .await?
        .map(|a| a.identifier)
        .ok_or_else(|| AppError::not_found("Account", "id", id))?;
    tx.lock_account(&identifier)
        .await?
        .ok_or_else(|| AppError::not_found("Account", "id", id))
}

impl AccountService {
    /// Creates an account service drawing identifiers from the CSPRNG.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_identifiers(store, Arc::new(RandomIdentifiers))
    }

    /// Creates an account service with a custom identifier source.
    #[must_use]
    pub fn with_identifiers(store: Arc<dyn Store>, identifiers: Arc<dyn IdentifierSource>) -> Self {
        Self { store, identifiers }
    }

    /// Opens an account with zero balance for an existing customer.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound` for an unknown customer, or
    /// `GenerationExhausted` if no unused identifier turns up.
    pub async fn create(&self, principal: &Principal, input: OpenAccountInput) -> AppResult<OwnedAccount> {
        ensure(principal, Action::Create, Target::Account { owner: input.client_id })?;

        let mut tx = self.store.begin().await?;
        let owner = tx
            .lock_customer(input.client_id)
            .await?
            .ok_or_else(|| AppError::not_found("Customer", "id", input.client_id))?;

        let mut identifier = None;
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = self.identifiers.generate();
            if is_valid_identifier(&candidate) && !tx.identifier_exists(&candidate).await? {
                identifier = Some(candidate);
                break;
            }
        }
        let Some(identifier) = identifier else {
            error!(customer_id = %owner.id, "account identifier generation exhausted");
            return Err(AppError::GenerationExhausted {
                attempts: MAX_GENERATION_ATTEMPTS,
            });
        };

        let account = tx
            .insert_account(NewAccount {
                identifier,
                kind: input.kind,
                owner: owner.id,
                created_at: Local::now().naive_local(),
            })
            .await?;
        tx.commit().await?;

        info!(
            account = %account.identifier,
            kind = account.kind.as_str(),
            customer_id = %owner.id,
            "account opened"
        );
        Ok(OwnedAccount {
            account,
            owner_name: owner.full_name(),
        })
    }

    /// Returns an account by identifier.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn get(&self, principal: &Principal, identifier: &str) -> AppResult<OwnedAccount> {
        let mut tx = self.store.begin().await?;
        let account = tx
            .find_account_by_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::not_found("Account", "identifier", identifier))?;
        ensure(principal, Action::View, Target::Account { owner: account.owner })?;
        let mut owned = with_owners(tx.as_mut(), vec![account]).await?;
        owned
            .pop()
            .ok_or_else(|| AppError::Internal("account vanished".to_string()))
    }

    /// Returns the accounts of one customer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `NotFound` for an unknown customer.
    pub async fn list_by_customer(
        &self,
        principal: &Principal,
        customer_id: CustomerId,
    ) -> AppResult<Vec<OwnedAccount>> {
        ensure(principal, Action::View, Target::Customer(customer_id))?;
        let mut tx = self.store.begin().await?;
        if tx.find_customer(customer_id).await?.is_none() {
            return Err(AppError::not_found("Customer", "id", customer_id));
        }
        let accounts = tx.accounts_of(customer_id).await?;
        with_owners(tx.as_mut(), accounts).await
    }

    /// Lists accounts visible to the principal.
    ///
    /// Administrators page through every account, newest first. Users get
    /// all of their customer's accounts as a single page; users without a
    /// customer get an empty page.
    ///
    /// # Errors
    ///
    /// Returns store errors only.
    pub async fn list(&self, principal: &Principal, page: PageRequest) -> AppResult<PageResponse<OwnedAccount>> {
        let mut tx = self.store.begin().await?;
        match scope(principal) {
            Scope::All => {
                let (accounts, total) = tx.list_accounts(page).await?;
                let owned = with_owners(tx.as_mut(), accounts).await?;
                Ok(PageResponse::new(owned, page, total))
            }
            Scope::Customer(customer_id) => {
                let accounts = tx.accounts_of(customer_id).await?;
                let owned = with_owners(tx.as_mut(), accounts).await?;
                Ok(PageResponse::single(owned, page.size))
            }
            Scope::Nothing => Ok(PageResponse::new(Vec::new(), PageRequest::new(0, page.size), 0)),
        }
    }

    /// Deletes an account and its ledger. The balance must be exactly zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden`, or `OperationNotAllowed` for a
    /// non-zero balance.
    pub async fn delete(&self, principal: &Principal, id: AccountId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let account = lock_by_id(tx.as_mut(), id).await?;
        ensure(principal, Action::Delete, Target::Account { owner: account.owner })?;

        if account.balance != Decimal::ZERO {
            warn!(account = %account.identifier, balance = %account.balance, "account delete refused");
            return Err(AppError::not_allowed(format!(
                "Cannot delete account {}: balance must be zero",
                account.identifier
            )));
        }
        tx.delete_entries_of(account.id).await?;
        tx.delete_account(account.id).await?;
        tx.commit().await?;

        info!(account = %account.identifier, by = %principal.username, "account deleted");
        Ok(())
    }

    /// Marks an account inactive. Deactivating an inactive account is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn deactivate(&self, principal: &Principal, id: AccountId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let mut account = lock_by_id(tx.as_mut(), id).await?;
        ensure(principal, Action::Update, Target::Account { owner: account.owner })?;

        if account.active {
            account.active = false;
            account.updated_at = Local::now().naive_local();
            tx.update_account(&account).await?;
            tx.commit().await?;
            info!(account = %account.identifier, by = %principal.username, "account deactivated");
        }
        Ok(())
    }
}
