//! Account lifecycle: opening, lookup, listing, deactivation and deletion.
//!
//! Balances are never touched here; the transaction engine in
//! [`crate::ledger`] is their only writer.

pub mod identifier;
mod service;
mod types;


pub use identifier::{IdentifierSource, RandomIdentifiers, format_identifier, is_valid_identifier};
pub use service::{AccountService, MAX_GENERATION_ATTEMPTS};
pub use types::{Account, AccountKind, NewAccount, OpenAccountInput, OwnedAccount};
