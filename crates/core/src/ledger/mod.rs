//! Ledger: append-only balance movements and the engine that posts them.
//!
//! - [`entry`]: entry kinds and records
//! - [`types`]: movement requests, validation and periods
//! - [`TransactionEngine`]: deposit, withdraw, transfer and history queries

pub mod entry;
mod engine;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::TransactionEngine;
pub use entry::{EntryKind, LedgerEntry, NewLedgerEntry};
pub use types::{
    MAX_DESCRIPTION_LEN, OperationInput, Period, PeriodQuery, TransferInput, description_or,
    validate_movement,
};
