//! Account statements rendered as PDF.

mod render;

pub use render::{BANK_NAME, EMPTY_PERIOD, RenderError, StatementInput, TITLE, render};

use std::sync::Arc;

use chrono::Local;
use tracing::{error, info};

use egabank_shared::{AppError, AppResult};

use crate::access::{Action, Principal, Target, ensure};
use crate::ledger::Period;
use crate::store::Store;

/// A rendered statement ready for download.
#[derive(Debug, Clone)]
pub struct Statement {
    /// Suggested file name.
    pub filename: String,
    /// PDF bytes.
    pub bytes: Vec<u8>,
}

/// Builds the download name, e.g. `statement_TG53EGA0_2026-01-01_2026-01-31.pdf`.
#[must_use]
pub fn statement_filename(identifier: &str, period: Period) -> String {
    let prefix: String = identifier.chars().take(8).collect();
    format!(
        "statement_{prefix}_{}_{}.pdf",
        period.start.format("%Y-%m-%d"),
        period.end.format("%Y-%m-%d")
    )
}

/// Statement service.
pub struct StatementService {
    store: Arc<dyn Store>,
}

impl StatementService {
    /// Creates a new statement service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Renders the statement of one account over a period.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden`, or `StatementGeneration` if the
    /// document cannot be produced.
    pub async fn generate(
        &self,
        principal: &Principal,
        identifier: &str,
        period: Period,
    ) -> AppResult<Statement> {
        let mut tx = self.store.begin().await?;
        let account = tx
            .find_account_by_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::not_found("Account", "identifier", identifier))?;
        ensure(principal, Action::View, Target::Account { owner: account.owner })?;

        let holder = tx
            .find_customer(account.owner)
            .await?
            .map(|c| c.full_name())
            .unwrap_or_default();
        let mut entries = tx
            .entries_of(account.id, Some((period.starts_at(), period.ends_at())))
            .await?;
        drop(tx);
        entries.reverse();

        let bytes = render(&StatementInput {
            holder: &holder,
            account: &account,
            period,
            entries: &entries,
            generated_at: Local::now().naive_local(),
        })
        .map_err(|e| {
            error!(account = %identifier, error = %e, "statement rendering failed");
            AppError::from(e)
        })?;

        info!(account = %identifier, entries = entries.len(), size = bytes.len(), "statement generated");
        Ok(Statement {
            filename: statement_filename(identifier, period),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    use egabank_shared::types::{AccountId, CustomerId, LedgerEntryId};

    use super::*;
    use crate::account::{Account, AccountKind, AccountService, OpenAccountInput};
    use crate::ledger::{EntryKind, LedgerEntry, OperationInput, TransactionEngine};
    use crate::testing::{admin, memory_store, now, seed_customer, user_of};

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    fn account() -> Account {
        Account {
            id: AccountId::new(1),
            identifier: "TG53EGA0000112345678901".into(),
            kind: AccountKind::Savings,
            balance: dec!(750.00),
            active: true,
            owner: CustomerId::new(1),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn entry(id: i64, kind: EntryKind, before: rust_decimal::Decimal, amount: rust_decimal::Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(id),
            kind,
            amount,
            occurred_at: now(),
            description: kind.label().into(),
            counterparty: None,
            balance_before: before,
            balance_after: kind.apply(before, amount),
            account_id: AccountId::new(1),
            account_identifier: "TG53EGA0000112345678901".into(),
        }
    }

    fn period() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap()
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 2)
            .and_then(|d| d.and_hms_opt(8, 15, 0))
            .unwrap()
    }

    #[test]
    fn test_render_is_deterministic() {
        let account = account();
        let entries = vec![
            entry(1, EntryKind::Deposit, dec!(0.00), dec!(1000.00)),
            entry(2, EntryKind::Withdrawal, dec!(1000.00), dec!(250.00)),
        ];
        let input = StatementInput {
            holder: "Jean Dupont",
            account: &account,
            period: period(),
            entries: &entries,
            generated_at: generated_at(),
        };

        let first = render(&input).unwrap();
        let second = render(&input).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF-1.5"));
        assert!(contains(&first, "(EGA BANK)"));
        assert!(contains(&first, "(Account Statement)"));
        assert!(contains(&first, "(Holder: Jean Dupont)"));
        assert!(contains(&first, "(Type: Savings Account)"));
        assert!(contains(&first, "(Period: 01/03/2024 - 31/03/2024)"));
        assert!(contains(&first, "(1000.00 XOF)"));
        assert!(contains(&first, "(Number of operations: 2)"));
        assert!(contains(&first, "(Current balance: 750.00 XOF)"));
        assert!(!contains(&first, EMPTY_PERIOD));

        let later = render(&StatementInput {
            generated_at: generated_at() + chrono::Duration::minutes(1),
            ..input
        })
        .unwrap();
        assert_ne!(first, later);
    }

    #[test]
    fn test_render_empty_period() {
        let account = account();
        let bytes = render(&StatementInput {
            holder: "Jean Dupont",
            account: &account,
            period: period(),
            entries: &[],
            generated_at: generated_at(),
        })
        .unwrap();
        assert!(contains(&bytes, EMPTY_PERIOD));
        assert!(contains(&bytes, "(Number of operations: 0)"));
    }

    #[test]
    fn test_long_history_spans_pages() {
        let account = account();
        let entries: Vec<_> = (1..=80)
            .map(|i| entry(i, EntryKind::Deposit, dec!(0.00), dec!(1.00)))
            .collect();
        let bytes = render(&StatementInput {
            holder: "Jean Dupont",
            account: &account,
            period: period(),
            entries: &entries,
            generated_at: generated_at(),
        })
        .unwrap();
        assert!(contains(&bytes, "(Page 1 / 3)") || contains(&bytes, "(Page 1 / 2)"));
        assert!(contains(&bytes, "(Number of operations: 80)"));
    }

    #[test]
    fn test_filename() {
        assert_eq!(
            statement_filename("TG53EGA0000112345678901", period()),
            "statement_TG53EGA0_2024-03-01_2024-03-31.pdf"
        );
    }

    #[tokio::test]
    async fn test_generate_checks_access() {
        let store = memory_store();
        let jean = seed_customer(&store, "Dupont", "Jean", None).await;
        let paul = seed_customer(&store, "Martin", "Paul", None).await;
        let accounts = AccountService::new(Arc::clone(&store));
        let engine = TransactionEngine::new(Arc::clone(&store));
        let statements = StatementService::new(Arc::clone(&store));
        let account = accounts
            .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: jean.id })
            .await
            .unwrap()
            .account;
        engine
            .deposit(&admin(), &account.identifier, OperationInput { amount: dec!(42.00), description: None })
            .await
            .unwrap();

        let today = Local::now().date_naive();
        let period = Period::new(today, today).unwrap();
        let statement = statements
            .generate(&user_of(jean.id), &account.identifier, period)
            .await
            .unwrap();
        assert!(statement.filename.starts_with("statement_"));
        assert!(contains(&statement.bytes, "(Holder: Jean Dupont)"));
        assert!(contains(&statement.bytes, "(42.00 XOF)"));

        let err = statements
            .generate(&user_of(paul.id), &account.identifier, period)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = statements
            .generate(&admin(), "TG00EGA0000199999999999", period)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
