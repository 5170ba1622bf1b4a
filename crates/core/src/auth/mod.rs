//! Authentication: credentials, password hashing and token issuance.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Stored principal records
//! - The auth service (register, login, refresh, token authentication)

mod password;
mod service;

pub use password::{PasswordError, hash_password, verify_password};
pub use service::AuthService;

use egabank_shared::auth::TokenSubject;
use egabank_shared::types::{CustomerId, PrincipalId};

use crate::access::{Principal, Role};

/// A stored login identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Principal ID.
    pub id: PrincipalId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Disabled principals cannot log in.
    pub enabled: bool,
    /// Linked customer.
    pub customer_id: Option<CustomerId>,
}

impl PrincipalRecord {
    /// Returns the identity used by the authorization gate.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            customer_id: self.customer_id,
        }
    }

    /// Returns the facts embedded in issued tokens.
    #[must_use]
    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            principal_id: self.id.into_inner(),
            username: self.username.clone(),
            role: self.role.as_str().to_string(),
            customer_id: self.customer_id.map(CustomerId::into_inner),
        }
    }
}

/// Record handed to the store when creating a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Whether the principal may log in.
    pub enabled: bool,
    /// Linked customer.
    pub customer_id: Option<CustomerId>,
}

impl NewPrincipal {
    /// Attaches the store-assigned ID.
    #[must_use]
    pub fn with_id(self, id: PrincipalId) -> PrincipalRecord {
        PrincipalRecord {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            enabled: self.enabled,
            customer_id: self.customer_id,
        }
    }
}
