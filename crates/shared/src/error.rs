//! Application-wide error types.
//!
//! Every fallible operation in the workspace ends up as an [`AppError`]. Each
//! variant knows the HTTP status it maps to and the short label rendered in
//! the `error` field of the response body; the api crate owns the actual
//! rendering.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::money::format_amount;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Field name to message map carried by validation failures.
pub type FieldErrors = BTreeMap<String, String>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// A looked-up resource does not exist.
    #[error("{resource} not found with {field}: {value}")]
    NotFound {
        /// Kind of resource, e.g. `Account`.
        resource: &'static str,
        /// Lookup key name.
        field: &'static str,
        /// Lookup key value.
        value: String,
    },

    /// A uniqueness constraint would be violated.
    #[error("{resource} already exists with {field}: {value}")]
    Duplicate {
        /// Kind of resource.
        resource: &'static str,
        /// Conflicting field.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// A uniqueness constraint was violated and the conflicting value is
    /// not known, e.g. when the database rejects a racing insert.
    #[error("{resource} already exists with this {field}")]
    Conflict {
        /// Kind of resource.
        resource: &'static str,
        /// Conflicting field.
        field: &'static str,
    },

    /// A business rule forbids the operation in the current state.
    #[error("{0}")]
    OperationNotAllowed(String),

    /// A debit exceeds the available balance.
    #[error(
        "Insufficient balance on account {account}. Balance: {}, requested: {}",
        format_amount(*balance),
        format_amount(*requested)
    )]
    InsufficientBalance {
        /// Account identifier.
        account: String,
        /// Balance at the time of the attempt.
        balance: Decimal,
        /// Requested debit.
        requested: Decimal,
    },

    /// Input failed validation.
    #[error("The submitted data is not valid")]
    Validation(FieldErrors),

    /// Username or password did not match.
    #[error("Invalid username or password")]
    BadCredentials,

    /// No authenticated principal on a protected route.
    #[error("Authentication required")]
    Unauthenticated,

    /// The principal is authenticated but may not touch the target.
    #[error("{0}")]
    Forbidden(String),

    /// A token could not be verified or has the wrong kind.
    #[error("{0}")]
    InvalidToken(String),

    /// No unused account identifier was found.
    #[error("Unable to generate a unique account identifier after {attempts} attempts")]
    GenerationExhausted {
        /// Number of candidates tried.
        attempts: u32,
    },

    /// The PDF statement could not be produced.
    #[error("Statement generation failed: {0}")]
    StatementGeneration(String),

    /// Persistence layer failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a `NotFound` error.
    pub fn not_found(resource: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            resource,
            field,
            value: value.to_string(),
        }
    }

    /// Builds a `Duplicate` error.
    pub fn duplicate(resource: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::Duplicate {
            resource,
            field,
            value: value.to_string(),
        }
    }

    /// Builds a `Conflict` error.
    #[must_use]
    pub const fn conflict(resource: &'static str, field: &'static str) -> Self {
        Self::Conflict { resource, field }
    }

    /// Builds an `OperationNotAllowed` error.
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::OperationNotAllowed(message.into())
    }

    /// Builds a `Validation` error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), message.into());
        Self::Validation(errors)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Duplicate { .. } | Self::Conflict { .. } => 409,
            Self::OperationNotAllowed(_)
            | Self::InsufficientBalance { .. }
            | Self::Validation(_) => 400,
            Self::BadCredentials | Self::Unauthenticated | Self::InvalidToken(_) => 401,
            Self::Forbidden(_) => 403,
            Self::GenerationExhausted { .. }
            | Self::StatementGeneration(_)
            | Self::Store(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns the short label rendered in the `error` field of responses.
    #[must_use]
    pub const fn error_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Not Found",
            Self::Duplicate { .. } | Self::Conflict { .. } => "Conflict",
            Self::OperationNotAllowed(_) => "Operation Not Allowed",
            Self::InsufficientBalance { .. } => "Insufficient Balance",
            Self::Validation(_) => "Validation Failed",
            Self::BadCredentials | Self::Unauthenticated => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::InvalidToken(_) => "Invalid Token",
            Self::GenerationExhausted { .. } => "Generation Failed",
            Self::StatementGeneration(_) => "Statement Generation Failed",
            Self::Store(_) | Self::Internal(_) => "Internal Server Error",
        }
    }

    /// Returns true for failures caused by the server rather than the caller.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Returns the message safe to show to API clients.
    ///
    /// Store and internal failures are replaced by a generic message so
    /// driver details never leak.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the field errors for validation failures.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| "invalid value".to_string());
                (camel_case(&field), message)
            })
            .collect();
        Self::Validation(fields)
    }
}

/// Converts a Rust field name to the camelCase key used on the wire.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AppError::not_found("Account", "identifier", "X"), 404)]
    #[case(AppError::duplicate("Customer", "email", "a@b.c"), 409)]
    #[case(AppError::conflict("Account", "identifier"), 409)]
    #[case(AppError::not_allowed("nope"), 400)]
    #[case(AppError::InsufficientBalance { account: "A".into(), balance: dec!(1), requested: dec!(2) }, 400)]
    #[case(AppError::invalid_field("amount", "must be positive"), 400)]
    #[case(AppError::BadCredentials, 401)]
    #[case(AppError::Unauthenticated, 401)]
    #[case(AppError::InvalidToken("bad".into()), 401)]
    #[case(AppError::Forbidden("no".into()), 403)]
    #[case(AppError::GenerationExhausted { attempts: 100 }, 500)]
    #[case(AppError::StatementGeneration("pdf".into()), 500)]
    #[case(AppError::Store("db".into()), 500)]
    #[case(AppError::Internal("boom".into()), 500)]
    fn test_error_status_codes(#[case] error: AppError, #[case] status: u16) {
        assert_eq!(error.status_code(), status);
    }

    #[test]
    fn test_error_labels() {
        assert_eq!(AppError::BadCredentials.error_label(), "Unauthorized");
        assert_eq!(
            AppError::not_allowed("x").error_label(),
            "Operation Not Allowed"
        );
        assert_eq!(
            AppError::Store("x".into()).error_label(),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_insufficient_balance_message_carries_amounts() {
        let error = AppError::InsufficientBalance {
            account: "TG53EGA0000112345678901".into(),
            balance: dec!(100),
            requested: dec!(100.01),
        };
        assert_eq!(
            error.to_string(),
            "Insufficient balance on account TG53EGA0000112345678901. Balance: 100.00, requested: 100.01"
        );
    }

    #[test]
    fn test_conflict_message_has_no_placeholder_value() {
        let error = AppError::conflict("Customer", "email");
        assert_eq!(error.to_string(), "Customer already exists with this email");
        assert_eq!(error.error_label(), "Conflict");
    }

    #[test]
    fn test_not_found_message() {
        let error = AppError::not_found("Customer", "id", 42);
        assert_eq!(error.to_string(), "Customer not found with id: 42");
    }

    #[test]
    fn test_public_message_hides_internals() {
        let error = AppError::Store("connection reset by peer".into());
        assert_eq!(error.public_message(), "An unexpected error occurred");
        assert!(error.is_server_error());

        let error = AppError::not_allowed("Account is inactive");
        assert_eq!(error.public_message(), "Account is inactive");
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(camel_case("birth_date"), "birthDate");
        assert_eq!(camel_case("amount"), "amount");
    }

    #[test]
    fn test_field_errors_only_for_validation() {
        let error = AppError::invalid_field("phone", "invalid phone number");
        assert_eq!(
            error.field_errors().and_then(|f| f.get("phone")).map(String::as_str),
            Some("invalid phone number")
        );
        assert!(AppError::BadCredentials.field_errors().is_none());
    }
}
