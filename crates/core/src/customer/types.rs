//! Customer domain types and input validation.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use egabank_shared::types::CustomerId;

use crate::account::Account;

/// Accepted phone number shape: optional `+` then 8 to 15 digits.
pub static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]{8,15}$").unwrap_or_else(|e| panic!("invalid phone pattern: {e}"))
});

/// Customer sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sex {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Sex {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            other => Err(format!("unknown sex: {other}")),
        }
    }
}

/// A bank customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer ID.
    pub id: CustomerId,
    /// Family name.
    pub family_name: String,
    /// Given name.
    pub given_name: String,
    /// Birth date.
    pub birth_date: NaiveDate,
    /// Sex.
    pub sex: Sex,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Email address, unique when present.
    pub email: Option<String>,
    /// Nationality.
    pub nationality: Option<String>,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

impl Customer {
    /// Returns "given family", without stray spaces when one part is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

/// Customer fields as supplied by callers; used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    /// Family name.
    #[validate(length(min = 2, max = 50, message = "Family name must be between 2 and 50 characters"))]
    pub family_name: String,
    /// Given name.
    #[validate(length(min = 2, max = 50, message = "Given name must be between 2 and 50 characters"))]
    pub given_name: String,
    /// Birth date, strictly in the past.
    #[validate(custom(function = "validate_past_date"))]
    pub birth_date: NaiveDate,
    /// Sex.
    pub sex: Sex,
    /// Postal address.
    #[serde(default)]
    #[validate(length(max = 200, message = "Address must not exceed 200 characters"))]
    pub address: Option<String>,
    /// Phone number.
    #[serde(default)]
    #[validate(regex(path = *PHONE_PATTERN, message = "Phone number is not valid"))]
    pub phone: Option<String>,
    /// Email address.
    #[serde(default)]
    #[validate(email(message = "Email is not valid"))]
    pub email: Option<String>,
    /// Nationality.
    #[serde(default)]
    #[validate(length(max = 50, message = "Nationality must not exceed 50 characters"))]
    pub nationality: Option<String>,
}

fn validate_past_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date < Local::now().date_naive() {
        Ok(())
    } else {
        Err(ValidationError::new("past").with_message("Birth date must be in the past".into()))
    }
}

/// Record handed to the store when creating a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    /// Customer fields.
    pub fields: CustomerInput,
    /// Creation timestamp.
    pub created_at: NaiveDateTime,
}

/// A customer with the number of accounts it owns.
#[derive(Debug, Clone)]
pub struct CustomerSummary {
    /// The customer.
    pub customer: Customer,
    /// Number of owned accounts.
    pub account_count: usize,
}

/// A customer with its accounts, oldest first.
#[derive(Debug, Clone)]
pub struct CustomerDetails {
    /// The customer.
    pub customer: Customer,
    /// Owned accounts.
    pub accounts: Vec<Account>,
}

impl Customer {
    /// Builds a customer from stored fields.
    #[must_use]
    pub fn from_input(id: CustomerId, fields: CustomerInput, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            family_name: fields.family_name,
            given_name: fields.given_name,
            birth_date: fields.birth_date,
            sex: fields.sex,
            address: fields.address,
            phone: fields.phone,
            email: fields.email,
            nationality: fields.nationality,
            created_at,
        }
    }

    /// Overwrites the editable fields.
    pub fn apply(&mut self, fields: CustomerInput) {
        self.family_name = fields.family_name;
        self.given_name = fields.given_name;
        self.birth_date = fields.birth_date;
        self.sex = fields.sex;
        self.address = fields.address;
        self.phone = fields.phone;
        self.email = fields.email;
        self.nationality = fields.nationality;
    }

    /// Returns true if any of family name, given name or email contains
    /// `term`, ignoring case.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.family_name.to_lowercase().contains(&needle)
            || self.given_name.to_lowercase().contains(&needle)
            || self
                .email
                .as_deref()
                .is_some_and(|email| email.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> CustomerInput {
        CustomerInput {
            family_name: "Dupont".into(),
            given_name: "Jean".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            sex: Sex::Male,
            address: Some("12 rue du Port, Lomé".into()),
            phone: Some("+22890123456".into()),
            email: Some("j@x.tg".into()),
            nationality: Some("Togolaise".into()),
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_invalid_fields_reported() {
        let bad = CustomerInput {
            family_name: "D".into(),
            phone: Some("12-34".into()),
            email: Some("nope".into()),
            birth_date: Local::now().date_naive() + Duration::days(1),
            ..input()
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("family_name"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("birth_date"));
        assert!(!fields.contains_key("given_name"));

        let error: egabank_shared::AppError = errors.into();
        let fields = error.field_errors().unwrap();
        assert_eq!(fields["familyName"], "Family name must be between 2 and 50 characters");
        assert_eq!(fields["birthDate"], "Birth date must be in the past");
    }

    #[test]
    fn test_today_is_not_past() {
        let bad = CustomerInput {
            birth_date: Local::now().date_naive(),
            ..input()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_full_name_and_search() {
        let customer = Customer::from_input(
            CustomerId::new(1),
            input(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
        );
        assert_eq!(customer.full_name(), "Jean Dupont");
        assert!(customer.matches("dup"));
        assert!(customer.matches("JEAN"));
        assert!(customer.matches("x.tg"));
        assert!(!customer.matches("martin"));
    }

    #[test]
    fn test_input_deserializes_camel_case() {
        let json = r#"{
            "familyName": "Dupont",
            "givenName": "Jean",
            "birthDate": "1990-05-17",
            "sex": "MALE",
            "email": "j@x.tg"
        }"#;
        let parsed: CustomerInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sex, Sex::Male);
        assert!(parsed.phone.is_none());
    }
}
