//! Dashboard data types.

use rust_decimal::Decimal;
use serde::Serialize;

/// Headline figures shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Customers visible to the caller.
    pub total_clients: u64,
    /// Accounts visible to the caller.
    pub total_accounts: u64,
    /// Active accounts among them.
    pub active_accounts: u64,
    /// Sum of their balances.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub total_balance: Decimal,
    /// Ledger entries on them.
    pub total_transactions: u64,
}
