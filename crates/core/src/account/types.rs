//! Account domain types.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use egabank_shared::types::{AccountId, CustomerId};

/// Account product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    /// Everyday current account.
    Current,
    /// Savings account.
    Savings,
}

impl AccountKind {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Savings => "SAVINGS",
        }
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Current => "Current Account",
            Self::Savings => "Savings Account",
        }
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRENT" => Ok(Self::Current),
            "SAVINGS" => Ok(Self::Savings),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// A balance-holding account owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Externally visible identifier, immutable.
    pub identifier: String,
    /// Product.
    pub kind: AccountKind,
    /// Current balance, never negative.
    pub balance: Decimal,
    /// Whether the account accepts operations.
    pub active: bool,
    /// Owning customer.
    pub owner: CustomerId,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
    /// Last modification timestamp.
    pub updated_at: NaiveDateTime,
}

/// Record handed to the store when opening an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Generated identifier.
    pub identifier: String,
    /// Product.
    pub kind: AccountKind,
    /// Owning customer.
    pub owner: CustomerId,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

/// Account opening request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountInput {
    /// Product.
    #[serde(rename = "type")]
    pub kind: AccountKind,
    /// Owning customer.
    pub client_id: CustomerId,
}

/// An account together with its owner's display name.
#[derive(Debug, Clone)]
pub struct OwnedAccount {
    /// The account.
    pub account: Account,
    /// Owner full name.
    pub owner_name: String,
}
