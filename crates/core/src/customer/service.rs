//! Customer service.

use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use tracing::{info, warn};
use validator::Validate;

use egabank_shared::types::{CustomerId, PageRequest, PageResponse};
use egabank_shared::{AppError, AppResult};

use super::types::{Customer, CustomerDetails, CustomerInput, CustomerSummary, NewCustomer};
use crate::access::{Action, Principal, Target, ensure};
use crate::store::{Store, StoreTx};

/// Customer service.
pub struct CustomerService {
    store: Arc<dyn Store>,
}

async fn load(tx: &mut dyn StoreTx, id: CustomerId) -> AppResult<Customer> {
    tx.find_customer(id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer", "id", id))
}

async fn summarize(tx: &mut dyn StoreTx, customer: Customer) -> AppResult<CustomerSummary> {
    let account_count = tx.accounts_of(customer.id).await?.len();
    Ok(CustomerSummary {
        customer,
        account_count,
    })
}

impl CustomerService {
    /// Creates a new customer service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a customer. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `Validation`, or `Duplicate` when the email is
    /// already used by another customer.
    pub async fn create(&self, principal: &Principal, input: CustomerInput) -> AppResult<CustomerSummary> {
        ensure(principal, Action::Create, Target::Directory)?;
        input.validate()?;

        let mut tx = self.store.begin().await?;
        if let Some(email) = input.email.as_deref()
            && tx.customer_email_taken(email, None).await?
        {
            return Err(AppError::duplicate("Customer", "email", email));
        }
        let customer = tx
            .insert_customer(NewCustomer {
                fields: input,
                created_at: Local::now().naive_local(),
            })
            .await?;
        tx.commit().await?;

        info!(customer_id = %customer.id, by = %principal.username, "customer created");
        Ok(CustomerSummary {
            customer,
            account_count: 0,
        })
    }

    /// Returns one customer with its account count.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `NotFound`.
    pub async fn get(&self, principal: &Principal, id: CustomerId) -> AppResult<CustomerSummary> {
        ensure(principal, Action::View, Target::Customer(id))?;
        let mut tx = self.store.begin().await?;
        let customer = load(tx.as_mut(), id).await?;
        summarize(tx.as_mut(), customer).await
    }

    /// Returns one customer with its accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `NotFound`.
    pub async fn get_with_accounts(
        &self,
        principal: &Principal,
        id: CustomerId,
    ) -> AppResult<CustomerDetails> {
        ensure(principal, Action::View, Target::Customer(id))?;
        let mut tx = self.store.begin().await?;
        let customer = load(tx.as_mut(), id).await?;
        let accounts = tx.accounts_of(id).await?;
        Ok(CustomerDetails { customer, accounts })
    }

    /// Pages through customers by family name then given name.
    /// Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`.
    pub async fn list(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> AppResult<PageResponse<CustomerSummary>> {
        self.find(principal, None, page).await
    }

    /// Case-insensitive substring search on family name, given name or
    /// email. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`.
    pub async fn search(
        &self,
        principal: &Principal,
        term: &str,
        page: PageRequest,
    ) -> AppResult<PageResponse<CustomerSummary>> {
        self.find(principal, Some(term.trim()), page).await
    }

    async fn find(
        &self,
        principal: &Principal,
        term: Option<&str>,
        page: PageRequest,
    ) -> AppResult<PageResponse<CustomerSummary>> {
        ensure(principal, Action::View, Target::Directory)?;
        let mut tx = self.store.begin().await?;
        let (customers, total) = tx.list_customers(term, page).await?;
        let mut summaries = Vec::with_capacity(customers.len());
        for customer in customers {
            summaries.push(summarize(tx.as_mut(), customer).await?);
        }
        Ok(PageResponse::new(summaries, page, total))
    }

    /// Replaces a customer's fields. Administrators or the customer itself.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `Validation`, `NotFound`, or `Duplicate` when
    /// the new email belongs to another customer.
    pub async fn update(
        &self,
        principal: &Principal,
        id: CustomerId,
        input: CustomerInput,
    ) -> AppResult<CustomerSummary> {
        ensure(principal, Action::Update, Target::Customer(id))?;
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let mut customer = load(tx.as_mut(), id).await?;
        if let Some(email) = input.email.as_deref()
            && customer.email.as_deref() != Some(email)
            && tx.customer_email_taken(email, Some(id)).await?
        {
            return Err(AppError::duplicate("Customer", "email", email));
        }
        customer.apply(input);
        tx.update_customer(&customer).await?;
        let summary = summarize(tx.as_mut(), customer).await?;
        tx.commit().await?;

        info!(customer_id = %id, by = %principal.username, "customer updated");
        Ok(summary)
    }

    /// Deletes a customer with its accounts, their ledgers and the linked
    /// principal, in one transaction. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound`, or `OperationNotAllowed` if any
    /// owned account has a non-zero balance.
    pub async fn delete(&self, principal: &Principal, id: CustomerId) -> AppResult<()> {
        ensure(principal, Action::Delete, Target::Customer(id))?;

        let mut tx = self.store.begin().await?;
        tx.lock_customer(id)
            .await?
            .ok_or_else(|| AppError::not_found("Customer", "id", id))?;
        let accounts = tx.lock_accounts_of(id).await?;
        if let Some(funded) = accounts.iter().find(|a| a.balance != Decimal::ZERO) {
            warn!(customer_id = %id, account = %funded.identifier, "customer delete refused");
            return Err(AppError::not_allowed(format!(
                "Cannot delete customer: account {} has a non-zero balance",
                funded.identifier
            )));
        }
        for account in &accounts {
            tx.delete_entries_of(account.id).await?;
            tx.delete_account(account.id).await?;
        }
        tx.delete_principal_of(id).await?;
        tx.delete_customer(id).await?;
        tx.commit().await?;

        info!(customer_id = %id, accounts = accounts.len(), by = %principal.username, "customer deleted");
        Ok(())
    }
}
