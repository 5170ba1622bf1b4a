//! Dashboard statistics, scoped like every other listing.

mod types;

pub use types::DashboardStats;

use std::sync::Arc;

use egabank_shared::AppResult;
use egabank_shared::types::AccountId;
use egabank_shared::types::money::to_money_scale;

use crate::access::{Principal, Scope, scope};
use crate::store::Store;

/// Dashboard service.
pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    /// Creates a new dashboard service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns bank-wide figures for administrators and the caller's own
    /// figures for users. Users without a customer get zeros.
    ///
    /// # Errors
    ///
    /// Returns store errors only.
    pub async fn stats(&self, principal: &Principal) -> AppResult<DashboardStats> {
        let mut tx = self.store.begin().await?;
        let stats = match scope(principal) {
            Scope::All => {
                let totals = tx.account_totals().await?;
                DashboardStats {
                    total_clients: tx.count_customers().await?,
                    total_accounts: totals.accounts,
                    active_accounts: totals.active,
                    total_balance: totals.balance,
                    total_transactions: tx.count_entries(None).await?,
                }
            }
            Scope::Customer(customer_id) => {
                let accounts = tx.accounts_of(customer_id).await?;
                let ids: Vec<AccountId> = accounts.iter().map(|a| a.id).collect();
                DashboardStats {
                    total_clients: 1,
                    total_accounts: accounts.len() as u64,
                    active_accounts: accounts.iter().filter(|a| a.active).count() as u64,
                    total_balance: accounts.iter().map(|a| a.balance).sum(),
                    total_transactions: tx.count_entries(Some(&ids)).await?,
                }
            }
            Scope::Nothing => DashboardStats::default(),
        };
        Ok(DashboardStats {
            total_balance: to_money_scale(stats.total_balance),
            ..stats
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::account::{AccountKind, AccountService, OpenAccountInput};
    use crate::ledger::{OperationInput, TransactionEngine};
    use crate::testing::{admin, memory_store, seed_customer, unlinked_user, user_of};

    #[tokio::test]
    async fn test_stats_scoping() {
        let store = memory_store();
        let jean = seed_customer(&store, "Dupont", "Jean", None).await;
        let paul = seed_customer(&store, "Martin", "Paul", None).await;
        let accounts = AccountService::new(Arc::clone(&store));
        let engine = TransactionEngine::new(Arc::clone(&store));
        let dashboard = DashboardService::new(Arc::clone(&store));

        let mut opened = Vec::new();
        for owner in [jean.id, jean.id, paul.id] {
            opened.push(
                accounts
                    .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: owner })
                    .await
                    .unwrap()
                    .account,
            );
        }
        for (account, amount) in opened.iter().zip([dec!(100.00), dec!(50.50), dec!(10.00)]) {
            engine
                .deposit(&admin(), &account.identifier, OperationInput { amount, description: None })
                .await
                .unwrap();
        }
        accounts.deactivate(&admin(), opened[1].id).await.unwrap();

        let all = dashboard.stats(&admin()).await.unwrap();
        assert_eq!(all.total_clients, 2);
        assert_eq!(all.total_accounts, 3);
        assert_eq!(all.active_accounts, 2);
        assert_eq!(all.total_balance, dec!(160.50));
        assert_eq!(all.total_transactions, 3);

        let mine = dashboard.stats(&user_of(jean.id)).await.unwrap();
        assert_eq!(mine.total_clients, 1);
        assert_eq!(mine.total_accounts, 2);
        assert_eq!(mine.active_accounts, 1);
        assert_eq!(mine.total_balance, dec!(150.50));
        assert_eq!(mine.total_transactions, 2);

        let none = dashboard.stats(&unlinked_user()).await.unwrap();
        assert_eq!(none.total_accounts, 0);
        assert_eq!(none.total_balance, Decimal::ZERO);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(DashboardStats::default()).unwrap();
        assert!(json.get("totalClients").is_some());
        assert!(json.get("activeAccounts").is_some());
        assert!(json["totalBalance"].is_number());
    }
}
