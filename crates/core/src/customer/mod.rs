//! Customers: identity records owning accounts.

mod service;
mod types;

#[cfg(test)]
mod tests;

pub use service::CustomerService;
pub use types::{
    Customer, CustomerDetails, CustomerInput, CustomerSummary, NewCustomer, PHONE_PATTERN, Sex,
};
