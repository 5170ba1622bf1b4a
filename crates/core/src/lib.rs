//! Core banking logic for EGA Bank.
//!
//! This crate contains the business rules with ZERO web or database
//! dependencies. Storage is reached only through the [`store`] traits.
//!
//! # Modules
//!
//! - `access` - Principals, roles and the authorization gate
//! - `account` - Account lifecycle and identifier generation
//! - `auth` - Registration, login, token refresh, password hashing
//! - `customer` - Customer lifecycle
//! - `dashboard` - Scoped headline statistics
//! - `ledger` - Transaction engine and ledger entries
//! - `statement` - PDF account statements
//! - `store` - Transactional persistence seam and in-memory store

pub mod access;
pub mod account;
pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod ledger;
pub mod statement;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
