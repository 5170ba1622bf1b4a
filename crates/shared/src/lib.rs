//! Shared types, errors, and configuration for EGA Bank.
//!
//! This crate provides common types used across all other crates:
//! - Money helpers with fixed two-digit precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT issuance and verification

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult, FieldErrors};
