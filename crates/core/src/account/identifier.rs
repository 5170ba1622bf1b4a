//! Account identifier generation and formatting.
//!
//! Identifiers look like international bank account numbers:
//! `TG` + 2 check digits + `EGA` + `00001` + 11 digits, 23 characters in
//! total. The check digits are random; this is a local scheme and not a
//! mod-97 checksum. Uniqueness is the caller's job.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Country tag.
pub const COUNTRY_CODE: &str = "TG";
/// Bank tag.
pub const BANK_CODE: &str = "EGA";
/// Branch tag.
pub const BRANCH_CODE: &str = "00001";
/// Number of trailing account digits.
pub const ACCOUNT_DIGITS: usize = 11;

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2}\d{2}[A-Z0-9]{10,30}$")
        .unwrap_or_else(|e| panic!("invalid identifier pattern: {e}"))
});

/// Source of candidate account identifiers.
pub trait IdentifierSource: Send + Sync {
    /// Returns a fresh candidate. Candidates are not guaranteed unique.
    fn generate(&self) -> String;
}

/// Generator drawing digits from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifiers;

impl IdentifierSource for RandomIdentifiers {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        let check: u8 = rng.random_range(0..100);
        let mut identifier = format!("{COUNTRY_CODE}{check:02}{BANK_CODE}{BRANCH_CODE}");
        for _ in 0..ACCOUNT_DIGITS {
            let digit: u8 = rng.random_range(0..10);
            identifier.push(char::from(b'0' + digit));
        }
        identifier
    }
}

/// Returns true if `identifier` has the shape of an account identifier.
#[must_use]
pub fn is_valid_identifier(identifier: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(identifier)
}

/// Formats an identifier in groups of four, e.g. `TG53 EGA0 0001 ...`.
#[must_use]
pub fn format_identifier(identifier: &str) -> String {
    let compact: String = identifier.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .as_bytes()
        .chunks(4)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_shape() {
        let identifier = RandomIdentifiers.generate();
        assert_eq!(identifier.len(), 23);
        assert!(identifier.starts_with("TG"));
        assert_eq!(&identifier[4..12], "EGA00001");
        assert!(is_valid_identifier(&identifier));
    }

    #[test]
    fn test_generated_mostly_distinct() {
        let seen: HashSet<String> = (0..200).map(|_| RandomIdentifiers.generate()).collect();
        assert!(seen.len() > 190);
    }

    #[test]
    fn test_validation() {
        assert!(is_valid_identifier("TG53EGA0000112345678901"));
        assert!(!is_valid_identifier("tg53EGA0000112345678901"));
        assert!(!is_valid_identifier("TG5XEGA0000112345678901"));
        assert!(!is_valid_identifier("TG53EGA"));
    }

    #[test]
    fn test_format_groups_of_four() {
        assert_eq!(
            format_identifier("TG53EGA0000112345678901"),
            "TG53 EGA0 0001 1234 5678 901"
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_identifiers_match_pattern(_seed in 0u8..255) {
            let identifier = RandomIdentifiers.generate();
            prop_assert!(is_valid_identifier(&identifier));
            prop_assert_eq!(format_identifier(&identifier).replace(' ', ""), identifier);
        }
    }
}
