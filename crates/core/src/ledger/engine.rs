//! Transaction engine: the only writer of balances and ledger entries.
//!
//! Every mutation runs inside one store transaction. The account row is
//! locked before its balance is read, and the new balance is written
//! together with the entry describing the movement, so a failure at any
//! step leaves nothing behind.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{info, warn};

use egabank_shared::types::money::{fits_money_scale, to_money_scale};
use egabank_shared::{AppError, AppResult};

use super::entry::{EntryKind, LedgerEntry, NewLedgerEntry};
use super::types::{OperationInput, Period, TransferInput, description_or, validate_movement};
use crate::access::{Action, Principal, Scope, Target, ensure, scope};
use crate::account::Account;
use crate::store::{Store, StoreTx};

const DEFAULT_DEPOSIT: &str = "Deposit";
const DEFAULT_WITHDRAWAL: &str = "Withdrawal";
const DEFAULT_TRANSFER: &str = "Transfer";

/// Posts deposits, withdrawals and transfers, and answers ledger queries.
pub struct TransactionEngine {
    store: Arc<dyn Store>,
}

/// One balance movement about to be written.
struct Movement<'a> {
    kind: EntryKind,
    amount: Decimal,
    description: &'a str,
    counterparty: Option<&'a str>,
    at: NaiveDateTime,
}

async fn lock(tx: &mut dyn StoreTx, identifier: &str) -> AppResult<Account> {
    tx.lock_account(identifier)
        .await?
        .ok_or_else(|| AppError::not_found("Account", "identifier", identifier))
}

async fn find(tx: &mut dyn StoreTx, identifier: &str) -> AppResult<Account> {
    tx.find_account_by_identifier(identifier)
        .await?
        .ok_or_else(|| AppError::not_found("Account", "identifier", identifier))
}

fn ensure_active(account: &Account) -> AppResult<()> {
    if account.active {
        Ok(())
    } else {
        warn!(account = %account.identifier, "operation on inactive account");
        Err(AppError::not_allowed(format!(
            "Account {} is inactive",
            account.identifier
        )))
    }
}

fn ensure_funds(account: &Account, amount: Decimal) -> AppResult<()> {
    if account.balance < amount {
        warn!(
            account = %account.identifier,
            balance = %account.balance,
            requested = %amount,
            "insufficient balance"
        );
        return Err(AppError::InsufficientBalance {
            account: account.identifier.clone(),
            balance: account.balance,
            requested: amount,
        });
    }
    Ok(())
}

/// Applies a movement to a locked account and appends its entry.
async fn post(tx: &mut dyn StoreTx, account: &mut Account, movement: Movement<'_>) -> AppResult<LedgerEntry> {
    let before = account.balance;
    let after = to_money_scale(movement.kind.apply(before, movement.amount));
    if after < Decimal::ZERO {
        return Err(AppError::InsufficientBalance {
            account: account.identifier.clone(),
            balance: before,
            requested: movement.amount,
        });
    }
    if !fits_money_scale(after) {
        return Err(AppError::invalid_field(
            "amount",
            "Resulting balance exceeds the supported precision",
        ));
    }

    account.balance = after;
    account.updated_at = movement.at;
    tx.update_account(account).await?;

    tx.append_entry(NewLedgerEntry {
        kind: movement.kind,
        amount: movement.amount,
        occurred_at: movement.at,
        description: movement.description.to_string(),
        counterparty: movement.counterparty.map(str::to_string),
        balance_before: before,
        balance_after: after,
        account_id: account.id,
        account_identifier: account.identifier.clone(),
    })
    .await
}

fn newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl TransactionEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Credits an active account.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound`, `Forbidden`, or
    /// `OperationNotAllowed` for an inactive account.
    pub async fn deposit(
        &self,
        principal: &Principal,
        identifier: &str,
        input: OperationInput,
    ) -> AppResult<LedgerEntry> {
        validate_movement(input.amount, input.description.as_deref())?;
        let amount = to_money_scale(input.amount);
        let description = description_or(input.description.as_deref(), DEFAULT_DEPOSIT);

        let mut tx = self.store.begin().await?;
        let mut account = lock(tx.as_mut(), identifier).await?;
        ensure(principal, Action::Operate, Target::Account { owner: account.owner })?;
        ensure_active(&account)?;

        let entry = post(
            tx.as_mut(),
            &mut account,
            Movement {
                kind: EntryKind::Deposit,
                amount,
                description: &description,
                counterparty: None,
                at: Local::now().naive_local(),
            },
        )
        .await?;
        tx.commit().await?;

        info!(account = %identifier, amount = %amount, balance = %entry.balance_after, "deposit posted");
        Ok(entry)
    }

    /// Debits an active account holding at least the requested amount.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `NotFound`, `Forbidden`, `OperationNotAllowed`
    /// for an inactive account, or `InsufficientBalance`.
    pub async fn withdraw(
        &self,
        principal: &Principal,
        identifier: &str,
        input: OperationInput,
    ) -> AppResult<LedgerEntry> {
        validate_movement(input.amount, input.description.as_deref())?;
        let amount = to_money_scale(input.amount);
        let description = description_or(input.description.as_deref(), DEFAULT_WITHDRAWAL);

        let mut tx = self.store.begin().await?;
        let mut account = lock(tx.as_mut(), identifier).await?;
        ensure(principal, Action::Operate, Target::Account { owner: account.owner })?;
        ensure_active(&account)?;
        ensure_funds(&account, amount)?;

        let entry = post(
            tx.as_mut(),
            &mut account,
            Movement {
                kind: EntryKind::Withdrawal,
                amount,
                description: &description,
                counterparty: None,
                at: Local::now().naive_local(),
            },
        )
        .await?;
        tx.commit().await?;

        info!(account = %identifier, amount = %amount, balance = %entry.balance_after, "withdrawal posted");
        Ok(entry)
    }

    /// Moves funds between two distinct active accounts.
    ///
    /// Both rows are locked in ascending identifier order. The two entries
    /// share one timestamp; the `TRANSFER_OUT` entry is returned.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `OperationNotAllowed` for a self-transfer or an
    /// inactive side, `NotFound`, `Forbidden` when the caller does not own
    /// the source, or `InsufficientBalance`.
    pub async fn transfer(&self, principal: &Principal, input: TransferInput) -> AppResult<LedgerEntry> {
        validate_movement(input.amount, input.description.as_deref())?;
        if input.source == input.dest {
            warn!(account = %input.source, "self-transfer rejected");
            return Err(AppError::not_allowed(
                "Source and destination accounts must be different",
            ));
        }
        let amount = to_money_scale(input.amount);
        let description = description_or(input.description.as_deref(), DEFAULT_TRANSFER);

        let mut tx = self.store.begin().await?;
        let (mut source, mut dest) = if input.source < input.dest {
            let source = lock(tx.as_mut(), &input.source).await?;
            let dest = lock(tx.as_mut(), &input.dest).await?;
            (source, dest)
        } else {
            let dest = lock(tx.as_mut(), &input.dest).await?;
            let source = lock(tx.as_mut(), &input.source).await?;
            (source, dest)
        };
        ensure(principal, Action::Operate, Target::Account { owner: source.owner })?;
        ensure_active(&source)?;
        ensure_active(&dest)?;
        ensure_funds(&source, amount)?;

        let at = Local::now().naive_local();
        let out = post(
            tx.as_mut(),
            &mut source,
            Movement {
                kind: EntryKind::TransferOut,
                amount,
                description: &description,
                counterparty: Some(&input.dest),
                at,
            },
        )
        .await?;
        post(
            tx.as_mut(),
            &mut dest,
            Movement {
                kind: EntryKind::TransferIn,
                amount,
                description: &description,
                counterparty: Some(&input.source),
                at,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            source = %input.source,
            dest = %input.dest,
            amount = %amount,
            "transfer posted"
        );
        Ok(out)
    }

    /// Entries of one account within a period, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn history(
        &self,
        principal: &Principal,
        identifier: &str,
        period: Period,
    ) -> AppResult<Vec<LedgerEntry>> {
        let mut tx = self.store.begin().await?;
        let account = find(tx.as_mut(), identifier).await?;
        ensure(principal, Action::View, Target::Account { owner: account.owner })?;
        tx.entries_of(account.id, Some((period.starts_at(), period.ends_at())))
            .await
    }

    /// Every entry of one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn all_by_account(&self, principal: &Principal, identifier: &str) -> AppResult<Vec<LedgerEntry>> {
        let mut tx = self.store.begin().await?;
        let account = find(tx.as_mut(), identifier).await?;
        ensure(principal, Action::View, Target::Account { owner: account.owner })?;
        tx.entries_of(account.id, None).await
    }

    /// Every entry visible to the principal, newest first.
    ///
    /// # Errors
    ///
    /// Returns store errors only.
    pub async fn all(&self, principal: &Principal) -> AppResult<Vec<LedgerEntry>> {
        let mut tx = self.store.begin().await?;
        match scope(principal) {
            Scope::All => tx.all_entries().await,
            Scope::Customer(customer_id) => {
                let mut entries = Vec::new();
                for account in tx.accounts_of(customer_id).await? {
                    entries.extend(tx.entries_of(account.id, None).await?);
                }
                newest_first(&mut entries);
                Ok(entries)
            }
            Scope::Nothing => Ok(Vec::new()),
        }
    }
}
