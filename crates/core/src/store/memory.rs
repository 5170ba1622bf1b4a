//! In-process store.
//!
//! A single async mutex guards the whole state. A transaction holds the
//! lock for its lifetime and works on a private copy that replaces the
//! shared state on commit, so transactions are fully serialized and an
//! abandoned transaction leaves no trace.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use egabank_shared::types::{AccountId, CustomerId, LedgerEntryId, PageRequest, PrincipalId};
use egabank_shared::{AppError, AppResult};

use super::{AccountTotals, Store, StoreTx};
use crate::account::{Account, NewAccount};
use crate::auth::{NewPrincipal, PrincipalRecord};
use crate::customer::{Customer, NewCustomer};
use crate::ledger::{LedgerEntry, NewLedgerEntry};

#[derive(Debug, Clone, Default)]
struct Sequences {
    customer: i64,
    account: i64,
    entry: i64,
    principal: i64,
}

#[derive(Debug, Clone, Default)]
struct State {
    customers: BTreeMap<CustomerId, Customer>,
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<LedgerEntryId, LedgerEntry>,
    principals: BTreeMap<PrincipalId, PrincipalRecord>,
    seq: Sequences,
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    work: State,
}

fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    items.iter().skip(offset).take(limit).cloned().collect()
}

fn newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by_key(|e| Reverse((e.occurred_at, e.id)));
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_customer(&mut self, new: NewCustomer) -> AppResult<Customer> {
        if let Some(email) = new.fields.email.as_deref()
            && self.customer_email_taken(email, None).await?
        {
            return Err(AppError::duplicate("Customer", "email", email));
        }
        self.work.seq.customer += 1;
        let customer =
            Customer::from_input(CustomerId::new(self.work.seq.customer), new.fields, new.created_at);
        self.work.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn find_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>> {
        Ok(self.work.customers.get(&id).cloned())
    }

    async fn lock_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>> {
        self.find_customer(id).await
    }

    async fn update_customer(&mut self, customer: &Customer) -> AppResult<()> {
        if let Some(email) = customer.email.as_deref()
            && self.customer_email_taken(email, Some(customer.id)).await?
        {
            return Err(AppError::duplicate("Customer", "email", email));
        }
        match self.work.customers.get_mut(&customer.id) {
            Some(stored) => {
                *stored = customer.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Customer", "id", customer.id)),
        }
    }

    async fn customer_email_taken(
        &mut self,
        email: &str,
        except: Option<CustomerId>,
    ) -> AppResult<bool> {
        Ok(self
            .work
            .customers
            .values()
            .any(|c| c.email.as_deref() == Some(email) && Some(c.id) != except))
    }

    async fn list_customers(
        &mut self,
        term: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Customer>, u64)> {
        let mut matching: Vec<Customer> = self
            .work
            .customers
            .values()
            .filter(|c| term.is_none_or(|t| c.matches(t)))
            .cloned()
            .collect();
        // Case-insensitive, like `lower(nom), lower(prenom)` on PostgreSQL.
        matching.sort_by_cached_key(|c| {
            (c.family_name.to_lowercase(), c.given_name.to_lowercase(), c.id)
        });
        let total = matching.len() as u64;
        Ok((page_of(&matching, page), total))
    }

    async fn count_customers(&mut self) -> AppResult<u64> {
        Ok(self.work.customers.len() as u64)
    }

    async fn delete_customer(&mut self, id: CustomerId) -> AppResult<()> {
        if self.work.accounts.values().any(|a| a.owner == id) {
            return Err(AppError::Store(format!("customer {id} still owns accounts")));
        }
        self.work.customers.remove(&id);
        Ok(())
    }

    async fn insert_account(&mut self, new: NewAccount) -> AppResult<Account> {
        if self.identifier_exists(&new.identifier).await? {
            return Err(AppError::duplicate("Account", "identifier", new.identifier));
        }
        if !self.work.customers.contains_key(&new.owner) {
            return Err(AppError::Store(format!("customer {} does not exist", new.owner)));
        }
        self.work.seq.account += 1;
        let account = Account {
            id: AccountId::new(self.work.seq.account),
            identifier: new.identifier,
            kind: new.kind,
            balance: egabank_shared::types::money::to_money_scale(rust_decimal::Decimal::ZERO),
            active: true,
            owner: new.owner,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.work.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn identifier_exists(&mut self, identifier: &str) -> AppResult<bool> {
        Ok(self.work.accounts.values().any(|a| a.identifier == identifier))
    }

    async fn find_account(&mut self, id: AccountId) -> AppResult<Option<Account>> {
        Ok(self.work.accounts.get(&id).cloned())
    }

    async fn find_account_by_identifier(&mut self, identifier: &str) -> AppResult<Option<Account>> {
        Ok(self
            .work
            .accounts
            .values()
            .find(|a| a.identifier == identifier)
            .cloned())
    }

    async fn lock_account(&mut self, identifier: &str) -> AppResult<Option<Account>> {
        // The whole state is already held exclusively.
        self.find_account_by_identifier(identifier).await
    }

    async fn update_account(&mut self, account: &Account) -> AppResult<()> {
        match self.work.accounts.get_mut(&account.id) {
            Some(stored) => {
                stored.balance = account.balance;
                stored.active = account.active;
                stored.updated_at = account.updated_at;
                Ok(())
            }
            None => Err(AppError::not_found("Account", "id", account.id)),
        }
    }

    async fn accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .work
            .accounts
            .values()
            .filter(|a| a.owner == owner)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }

    async fn lock_accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>> {
        self.accounts_of(owner).await
    }

    async fn list_accounts(&mut self, page: PageRequest) -> AppResult<(Vec<Account>, u64)> {
        let mut accounts: Vec<Account> = self.work.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| Reverse((a.created_at, a.id)));
        let total = accounts.len() as u64;
        Ok((page_of(&accounts, page), total))
    }

    async fn account_totals(&mut self) -> AppResult<AccountTotals> {
        Ok(self
            .work
            .accounts
            .values()
            .fold(AccountTotals::default(), |mut totals, account| {
                totals.accounts += 1;
                totals.active += u64::from(account.active);
                totals.balance += account.balance;
                totals
            }))
    }

    async fn delete_account(&mut self, id: AccountId) -> AppResult<()> {
        if self.work.entries.values().any(|e| e.account_id == id) {
            return Err(AppError::Store(format!("account {id} still has ledger entries")));
        }
        self.work.accounts.remove(&id);
        Ok(())
    }

    async fn append_entry(&mut self, new: NewLedgerEntry) -> AppResult<LedgerEntry> {
        if !self.work.accounts.contains_key(&new.account_id) {
            return Err(AppError::Store(format!("account {} does not exist", new.account_id)));
        }
        self.work.seq.entry += 1;
        let entry = new.with_id(LedgerEntryId::new(self.work.seq.entry));
        self.work.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn entries_of(
        &mut self,
        account: AccountId,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> AppResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .work
            .entries
            .values()
            .filter(|e| e.account_id == account)
            .filter(|e| range.is_none_or(|(from, until)| e.occurred_at >= from && e.occurred_at <= until))
            .cloned()
            .collect();
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn all_entries(&mut self) -> AppResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self.work.entries.values().cloned().collect();
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn count_entries(&mut self, accounts: Option<&[AccountId]>) -> AppResult<u64> {
        Ok(self
            .work
            .entries
            .values()
            .filter(|e| accounts.is_none_or(|ids| ids.contains(&e.account_id)))
            .count() as u64)
    }

    async fn delete_entries_of(&mut self, account: AccountId) -> AppResult<()> {
        self.work.entries.retain(|_, e| e.account_id != account);
        Ok(())
    }

    async fn insert_principal(&mut self, new: NewPrincipal) -> AppResult<PrincipalRecord> {
        if self.username_taken(&new.username).await? {
            return Err(AppError::duplicate("User", "username", new.username));
        }
        if self.principal_email_taken(&new.email).await? {
            return Err(AppError::duplicate("User", "email", new.email));
        }
        self.work.seq.principal += 1;
        let record = new.with_id(PrincipalId::new(self.work.seq.principal));
        self.work.principals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_principal(&mut self, username: &str) -> AppResult<Option<PrincipalRecord>> {
        Ok(self
            .work
            .principals
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn username_taken(&mut self, username: &str) -> AppResult<bool> {
        Ok(self.work.principals.values().any(|p| p.username == username))
    }

    async fn principal_email_taken(&mut self, email: &str) -> AppResult<bool> {
        Ok(self.work.principals.values().any(|p| p.email == email))
    }

    async fn count_principals(&mut self) -> AppResult<u64> {
        Ok(self.work.principals.len() as u64)
    }

    async fn delete_principal_of(&mut self, customer: CustomerId) -> AppResult<()> {
        self.work
            .principals
            .retain(|_, p| p.customer_id != Some(customer));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use crate::testing::{customer_input, now};

    async fn seed_customer(store: &MemoryStore) -> Customer {
        let mut tx = store.begin().await.unwrap();
        let customer = tx
            .insert_customer(NewCustomer {
                fields: customer_input("Dupont", "Jean", Some("j@x")),
                created_at: now(),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        customer
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_account(NewAccount {
                identifier: "TG00EGA0000100000000001".into(),
                kind: AccountKind::Current,
                owner: customer.id,
                created_at: now(),
            })
            .await
            .unwrap();
            // dropped without commit
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.accounts_of(customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unique_identifier_enforced() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let mut tx = store.begin().await.unwrap();
        let new = NewAccount {
            identifier: "TG00EGA0000100000000001".into(),
            kind: AccountKind::Savings,
            owner: customer.id,
            created_at: now(),
        };
        tx.insert_account(new.clone()).await.unwrap();
        let err = tx.insert_account(new).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_unique_customer_email_enforced() {
        let store = MemoryStore::new();
        seed_customer(&store).await;
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_customer(NewCustomer {
                fields: customer_input("Martin", "Paul", Some("j@x")),
                created_at: now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_customer_listing_order_and_filter() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for (family, given, email) in [
            ("Martin", "Paul", None),
            ("Dupont", "Jean", Some("j@x")),
            ("Dupont", "Alice", Some("alice@bank.tg")),
        ] {
            tx.insert_customer(NewCustomer {
                fields: customer_input(family, given, email),
                created_at: now(),
            })
            .await
            .unwrap();
        }

        let (page, total) = tx.list_customers(None, PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = page.iter().map(Customer::full_name).collect();
        assert_eq!(names, ["Alice Dupont", "Jean Dupont"]);

        let (found, total) = tx
            .list_customers(Some("BANK.TG"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].given_name, "Alice");
    }

    #[tokio::test]
    async fn test_customer_listing_ignores_case() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for family in ["Zola", "de Gaulle", "Martin"] {
            tx.insert_customer(NewCustomer {
                fields: customer_input(family, "Anne", None),
                created_at: now(),
            })
            .await
            .unwrap();
        }

        let (page, _) = tx.list_customers(None, PageRequest::default()).await.unwrap();
        let families: Vec<_> = page.iter().map(|c| c.family_name.as_str()).collect();
        assert_eq!(families, ["de Gaulle", "Martin", "Zola"]);

        let (found, total) = tx
            .list_customers(Some("_"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_delete_customer_requires_accounts_gone() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_account(NewAccount {
            identifier: "TG00EGA0000100000000001".into(),
            kind: AccountKind::Current,
            owner: customer.id,
            created_at: now(),
        })
        .await
        .unwrap();
        assert!(tx.delete_customer(customer.id).await.is_err());
    }
}
