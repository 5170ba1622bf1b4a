//! `SeaORM` entity definitions.
//!
//! Table and column names follow the bank's existing schema.

pub mod accounts;
pub mod clients;
pub mod transactions;
pub mod users;
