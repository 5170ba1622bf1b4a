//! Request types for balance movements and ledger queries.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;

use egabank_shared::types::money::fits_money_scale;
use egabank_shared::{AppError, AppResult, FieldErrors};

/// Longest accepted description.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Deposit or withdrawal request.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationInput {
    /// Amount to move.
    pub amount: Decimal,
    /// Optional description; a default is used when absent.
    #[serde(default)]
    pub description: Option<String>,
}

/// Transfer request.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferInput {
    /// Source account identifier.
    pub source: String,
    /// Destination account identifier.
    pub dest: String,
    /// Amount to move.
    pub amount: Decimal,
    /// Optional description; a default is used when absent.
    #[serde(default)]
    pub description: Option<String>,
}

/// Validates an amount and optional description.
///
/// Amounts must be strictly positive with at most two fractional digits and
/// fit the stored precision. Descriptions are capped at 255 characters.
///
/// # Errors
///
/// Returns `AppError::Validation` with one entry per offending field.
pub fn validate_movement(amount: Decimal, description: Option<&str>) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    if amount <= Decimal::ZERO {
        errors.insert("amount".into(), "Amount must be positive".into());
    } else if !fits_money_scale(amount) {
        errors.insert(
            "amount".into(),
            "Amount must have at most 2 decimal places and 17 integer digits".into(),
        );
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        errors.insert(
            "description".into(),
            format!("Description must not exceed {MAX_DESCRIPTION_LEN} characters"),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Returns the trimmed description, or `default` when absent or blank.
#[must_use]
pub fn description_or(description: Option<&str>, default: &str) -> String {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Inclusive calendar period used by history and statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// First day.
    pub start: NaiveDate,
    /// Last day, included.
    pub end: NaiveDate,
}

impl Period {
    /// Creates a period.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::invalid_field(
                "debut",
                "Start date must not be after end date",
            ));
        }
        Ok(Self { start, end })
    }

    /// First instant of the period.
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last representable instant of the end day.
    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        self.end.and_time(last)
    }

    /// Returns true if `at` falls within the period, both ends included.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.starts_at() && at <= self.ends_at()
    }
}

/// Query parameters carrying a period as `debut`/`fin`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PeriodQuery {
    /// First day (`yyyy-MM-dd`).
    pub debut: NaiveDate,
    /// Last day (`yyyy-MM-dd`), included.
    pub fin: NaiveDate,
}

impl TryFrom<PeriodQuery> for Period {
    type Error = AppError;

    fn try_from(query: PeriodQuery) -> AppResult<Self> {
        Self::new(query.debut, query.fin)
    }
}
