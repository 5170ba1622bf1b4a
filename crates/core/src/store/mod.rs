//! Persistence seam.
//!
//! Services talk to storage only through [`Store`] and the transactions it
//! opens. A [`StoreTx`] groups reads and writes into one atomic unit: changes
//! become visible on [`StoreTx::commit`], and dropping the transaction
//! without committing discards them.
//!
//! Implementations:
//! - [`MemoryStore`] (this crate): serializable, used by tests and the
//!   `memory` database URL.
//! - `PgStore` (db crate): PostgreSQL via SeaORM, with row locks on accounts
//!   and customers.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use egabank_shared::AppResult;
use egabank_shared::types::{AccountId, CustomerId, PageRequest};

use crate::account::{Account, NewAccount};
use crate::auth::{NewPrincipal, PrincipalRecord};
use crate::customer::{Customer, NewCustomer};
use crate::ledger::{LedgerEntry, NewLedgerEntry};

/// Entry point to a transactional store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;
}

/// Aggregate account figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountTotals {
    /// Number of accounts.
    pub accounts: u64,
    /// Number of active accounts.
    pub active: u64,
    /// Sum of balances.
    pub balance: Decimal,
}

/// Operations available inside a store transaction.
///
/// Lists come back in the order documented on each method. Uniqueness of
/// account identifiers, customer emails, usernames and principal emails is
/// enforced by the store; violating inserts fail with `AppError::Duplicate`
/// or `AppError::Conflict`.
#[async_trait]
pub trait StoreTx: Send {
    // ========== Customers ==========

    /// Inserts a customer.
    async fn insert_customer(&mut self, new: NewCustomer) -> AppResult<Customer>;

    /// Finds a customer by ID.
    async fn find_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>>;

    /// Finds a customer by ID and locks its row until the transaction ends.
    /// Account opening and customer deletion both take this lock, so they
    /// cannot interleave for the same customer.
    async fn lock_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>>;

    /// Replaces the stored fields of an existing customer.
    async fn update_customer(&mut self, customer: &Customer) -> AppResult<()>;

    /// Returns true if a customer other than `except` uses `email`.
    async fn customer_email_taken(
        &mut self,
        email: &str,
        except: Option<CustomerId>,
    ) -> AppResult<bool>;

    /// Pages through customers ordered case-insensitively by family name
    /// then given name, optionally filtered by a case-insensitive literal
    /// substring of family name, given name or email. Returns the page and
    /// the total match count.
    async fn list_customers(
        &mut self,
        term: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Customer>, u64)>;

    /// Counts customers.
    async fn count_customers(&mut self) -> AppResult<u64>;

    /// Deletes a customer row. Accounts, entries and principal links must
    /// already be gone.
    async fn delete_customer(&mut self, id: CustomerId) -> AppResult<()>;

    // ========== Accounts ==========

    /// Inserts an account with zero balance, active.
    async fn insert_account(&mut self, new: NewAccount) -> AppResult<Account>;

    /// Returns true if any account uses `identifier`.
    async fn identifier_exists(&mut self, identifier: &str) -> AppResult<bool>;

    /// Finds an account by ID.
    async fn find_account(&mut self, id: AccountId) -> AppResult<Option<Account>>;

    /// Finds an account by identifier without locking it.
    async fn find_account_by_identifier(&mut self, identifier: &str) -> AppResult<Option<Account>>;

    /// Finds an account by identifier and locks it until the transaction ends.
    async fn lock_account(&mut self, identifier: &str) -> AppResult<Option<Account>>;

    /// Persists balance, active flag and update timestamp.
    async fn update_account(&mut self, account: &Account) -> AppResult<()>;

    /// Accounts of one customer, oldest first.
    async fn accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>>;

    /// Accounts of one customer, oldest first, each locked like
    /// [`StoreTx::lock_account`].
    async fn lock_accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>>;

    /// Pages through all accounts, newest first.
    async fn list_accounts(&mut self, page: PageRequest) -> AppResult<(Vec<Account>, u64)>;

    /// Count, active count and balance sum over all accounts.
    async fn account_totals(&mut self) -> AppResult<AccountTotals>;

    /// Deletes an account row. Its entries must already be gone.
    async fn delete_account(&mut self, id: AccountId) -> AppResult<()>;

    // ========== Ledger ==========

    /// Appends a ledger entry.
    async fn append_entry(&mut self, new: NewLedgerEntry) -> AppResult<LedgerEntry>;

    /// Entries of one account, newest first (ties by ID, highest first),
    /// optionally restricted to `[from, until]`.
    async fn entries_of(
        &mut self,
        account: AccountId,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> AppResult<Vec<LedgerEntry>>;

    /// Every entry, newest first.
    async fn all_entries(&mut self) -> AppResult<Vec<LedgerEntry>>;

    /// Counts entries, either all of them or those of the given accounts.
    async fn count_entries(&mut self, accounts: Option<&[AccountId]>) -> AppResult<u64>;

    /// Deletes all entries of an account.
    async fn delete_entries_of(&mut self, account: AccountId) -> AppResult<()>;

    // ========== Principals ==========

    /// Inserts a principal.
    async fn insert_principal(&mut self, new: NewPrincipal) -> AppResult<PrincipalRecord>;

    /// Finds a principal by username.
    async fn find_principal(&mut self, username: &str) -> AppResult<Option<PrincipalRecord>>;

    /// Returns true if a principal uses `username`.
    async fn username_taken(&mut self, username: &str) -> AppResult<bool>;

    /// Returns true if a principal uses `email`.
    async fn principal_email_taken(&mut self, email: &str) -> AppResult<bool>;

    /// Counts principals.
    async fn count_principals(&mut self) -> AppResult<u64>;

    /// Deletes the principal linked to `customer`, if any.
    async fn delete_principal_of(&mut self, customer: CustomerId) -> AppResult<()>;

    // ========== Lifecycle ==========

    /// Makes every change of this transaction durable and visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
