//! Ledger entry types.
//!
//! Entries are append-only. Each one records the balance before and after
//! the movement so the per-account history forms a chain:
//! `next.balance_before == prev.balance_after`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use egabank_shared::types::{AccountId, LedgerEntryId};

/// Kind of balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Cash paid in.
    Deposit,
    /// Cash taken out.
    Withdrawal,
    /// Debit leg of a transfer.
    TransferOut,
    /// Credit leg of a transfer.
    TransferIn,
}

impl EntryKind {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::TransferOut => "TRANSFER_OUT",
            Self::TransferIn => "TRANSFER_IN",
        }
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::TransferOut => "Transfer sent",
            Self::TransferIn => "Transfer received",
        }
    }

    /// Returns true for kinds that increase the balance.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::TransferIn)
    }

    /// Returns the balance after applying `amount` of this kind to `before`.
    #[must_use]
    pub fn apply(&self, before: Decimal, amount: Decimal) -> Decimal {
        if self.is_credit() {
            before + amount
        } else {
            before - amount
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "TRANSFER_OUT" => Ok(Self::TransferOut),
            "TRANSFER_IN" => Ok(Self::TransferIn),
            other => Err(format!("unknown entry kind: {other}")),
        }
    }
}

/// A committed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID.
    pub id: LedgerEntryId,
    /// Movement kind.
    pub kind: EntryKind,
    /// Amount moved, always positive.
    pub amount: Decimal,
    /// When the movement happened.
    pub occurred_at: NaiveDateTime,
    /// Free-text description.
    pub description: String,
    /// Other side of a transfer.
    pub counterparty: Option<String>,
    /// Balance before the movement.
    pub balance_before: Decimal,
    /// Balance after the movement.
    pub balance_after: Decimal,
    /// Owning account.
    pub account_id: AccountId,
    /// Owning account identifier.
    pub account_identifier: String,
}

/// Record handed to the store when appending an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Movement kind.
    pub kind: EntryKind,
    /// Amount moved.
    pub amount: Decimal,
    /// When the movement happened.
    pub occurred_at: NaiveDateTime,
    /// Free-text description.
    pub description: String,
    /// Other side of a transfer.
    pub counterparty: Option<String>,
    /// Balance before the movement.
    pub balance_before: Decimal,
    /// Balance after the movement.
    pub balance_after: Decimal,
    /// Owning account.
    pub account_id: AccountId,
    /// Owning account identifier.
    pub account_identifier: String,
}

impl NewLedgerEntry {
    /// Attaches the store-assigned ID.
    #[must_use]
    pub fn with_id(self, id: LedgerEntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            kind: self.kind,
            amount: self.amount,
            occurred_at: self.occurred_at,
            description: self.description,
            counterparty: self.counterparty,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
            account_id: self.account_id,
            account_identifier: self.account_identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(EntryKind::Deposit, dec!(150.00))]
    #[case(EntryKind::TransferIn, dec!(150.00))]
    #[case(EntryKind::Withdrawal, dec!(50.00))]
    #[case(EntryKind::TransferOut, dec!(50.00))]
    fn test_apply(#[case] kind: EntryKind, #[case] expected: Decimal) {
        assert_eq!(kind.apply(dec!(100.00), dec!(50.00)), expected);
    }

    #[test]
    fn test_labels_and_names() {
        assert_eq!(EntryKind::TransferIn.label(), "Transfer received");
        assert_eq!(EntryKind::TransferOut.label(), "Transfer sent");
        assert_eq!(
            serde_json::to_string(&EntryKind::TransferOut).unwrap(),
            "\"TRANSFER_OUT\""
        );
        assert_eq!("WITHDRAWAL".parse::<EntryKind>().unwrap(), EntryKind::Withdrawal);
    }
}
