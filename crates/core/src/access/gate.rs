//! Role and ownership based authorization.

use egabank_shared::types::CustomerId;
use egabank_shared::{AppError, AppResult};

use super::Principal;

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read a resource.
    View,
    /// Create a resource.
    Create,
    /// Modify a resource.
    Update,
    /// Remove a resource.
    Delete,
    /// Move money on an account: deposit, withdrawal, or transfer out of it.
    Operate,
}

/// The resource an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The customer directory as a whole: listing, searching, creating.
    Directory,
    /// A single customer.
    Customer(CustomerId),
    /// An account, identified by its owner.
    Account {
        /// Owning customer.
        owner: CustomerId,
    },
}

/// Gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused.
    Deny,
}

/// Visibility of list-style queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Everything.
    All,
    /// Only data owned by one customer.
    Customer(CustomerId),
    /// Nothing; the principal has no linked customer.
    Nothing,
}

/// Decides whether `principal` may perform `action` on `target`.
#[must_use]
pub fn authorize(principal: &Principal, action: Action, target: Target) -> Decision {
    if principal.is_admin() {
        return Decision::Allow;
    }
    let allowed = match (action, target) {
        (_, Target::Directory) | (Action::Delete, Target::Customer(_)) => false,
        (_, Target::Customer(id)) => principal.acts_for(id),
        (_, Target::Account { owner }) => principal.acts_for(owner),
    };
    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Like [`authorize`], but returns `Forbidden` on deny.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the gate refuses.
pub fn ensure(principal: &Principal, action: Action, target: Target) -> AppResult<()> {
    match authorize(principal, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::warn!(
                principal = %principal.username,
                ?action,
                ?target,
                "access denied"
            );
            Err(AppError::Forbidden(denial_message(target).to_string()))
        }
    }
}

fn denial_message(target: Target) -> &'static str {
    match target {
        Target::Directory => "This operation is reserved to administrators",
        Target::Customer(_) => "You do not have access to this customer",
        Target::Account { .. } => "You do not have access to this account",
    }
}

/// Returns what list queries issued by `principal` may see.
#[must_use]
pub fn scope(principal: &Principal) -> Scope {
    if principal.is_admin() {
        return Scope::All;
    }
    principal.customer_id.map_or(Scope::Nothing, Scope::Customer)
}
