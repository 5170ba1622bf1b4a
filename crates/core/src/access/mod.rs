//! Principals, roles and the authorization gate.
//!
//! Every service operation receives the caller's [`Principal`] explicitly and
//! asks the gate before touching a resource. Administrators may do anything;
//! regular users only reach resources owned by their linked customer.

mod gate;

pub use gate::{Action, Decision, Scope, Target, authorize, ensure, scope};

use egabank_shared::types::{CustomerId, PrincipalId};
use serde::{Deserialize, Serialize};

/// Principal roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Bank staff with unrestricted access.
    Admin,
    /// Customer self-service access, scoped to the linked customer.
    User,
}

impl Role {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal ID.
    pub id: PrincipalId,
    /// Login name.
    pub username: String,
    /// Role.
    pub role: Role,
    /// Customer this principal acts for, if any.
    pub customer_id: Option<CustomerId>,
}

impl Principal {
    /// Returns true for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if the principal acts for `customer`.
    #[must_use]
    pub fn acts_for(&self, customer: CustomerId) -> bool {
        self.customer_id == Some(customer)
    }
}
