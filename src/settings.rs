//! Typed ledger configuration.
//!
//! Supports loading settings from:
//! - Default values (the `LibrarySettings` seed rows)
//! - `LibrarySettings` key/value rows
//! - A config file (TOML)
//! - Environment variables (`LEDGER_*`)
//!
//! ## Example config file:
//! ```toml
//! default_loan_duration = 21
//! fine_per_day = "0.25"
//! max_book_loans = 3
//! reservation_expiry_days = 5
//! ```

use std::path::Path;

use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, Result};

/// Settings the ledger reads for every operation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Days between `LoanDate` and `DueDate`
    pub default_loan_duration: u32,
    /// Fine charged per whole day late
    pub fine_per_day: Decimal,
    /// Most books a member may hold at once
    pub max_book_loans: u32,
    /// Days an activated reservation holds its copy
    pub reservation_expiry_days: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_loan_duration: 14,
            fine_per_day: Decimal::new(50, 2),
            max_book_loans: 5,
            reservation_expiry_days: 7,
        }
    }
}

impl LedgerSettings {
    /// `SettingName` of the loan duration row
    pub const DEFAULT_LOAN_DURATION: &'static str = "DefaultLoanDuration";
    /// `SettingName` of the daily fine row
    pub const FINE_PER_DAY: &'static str = "FinePerDay";
    /// `SettingName` of the loan cap row
    pub const MAX_BOOK_LOANS: &'static str = "MaxBookLoans";
    /// `SettingName` of the reservation expiry row
    pub const RESERVATION_EXPIRY_DAYS: &'static str = "ReservationExpiryDays";

    /// Build settings from `LibrarySettings` rows.
    ///
    /// Keys that are missing keep their default; unrecognised keys are skipped.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidSetting` if a recognised key holds a value
    /// of the wrong type or fails validation.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            match name {
                Self::DEFAULT_LOAN_DURATION => {
                    settings.default_loan_duration = parse_u32(name, value)?;
                }
                Self::FINE_PER_DAY => {
                    settings.fine_per_day = value
                        .parse::<Decimal>()
                        .map_err(|e| invalid(name, value, &e.to_string()))?;
                }
                Self::MAX_BOOK_LOANS => settings.max_book_loans = parse_u32(name, value)?,
                Self::RESERVATION_EXPIRY_DAYS => {
                    settings.reservation_expiry_days = parse_u32(name, value)?;
                }
                other => debug!(setting = other, "ignoring unrecognised setting"),
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from an optional file layered under `LEDGER_*` variables
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Config` if the file cannot be read or parsed, or
    /// `LedgerError::InvalidSetting` if the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Self = builder
            .add_source(Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the values are usable by the ledger
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidSetting` for a negative fine rate or a
    /// loan cap of zero.
    pub fn validate(&self) -> Result<()> {
        if self.fine_per_day.is_sign_negative() && !self.fine_per_day.is_zero() {
            return Err(invalid(
                Self::FINE_PER_DAY,
                &self.fine_per_day.to_string(),
                "must not be negative",
            ));
        }
        if self.max_book_loans == 0 {
            return Err(invalid(Self::MAX_BOOK_LOANS, "0", "must allow at least one loan"));
        }
        Ok(())
    }

    /// The settings as `LibrarySettings` rows
    #[must_use]
    pub fn to_pairs(&self) -> [(&'static str, String); 4] {
        [
            (Self::DEFAULT_LOAN_DURATION, self.default_loan_duration.to_string()),
            (Self::FINE_PER_DAY, self.fine_per_day.to_string()),
            (Self::MAX_BOOK_LOANS, self.max_book_loans.to_string()),
            (Self::RESERVATION_EXPIRY_DAYS, self.reservation_expiry_days.to_string()),
        ]
    }
}

/// Parse a non-negative whole number setting
fn parse_u32(name: &str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|e| invalid(name, value, &e.to_string()))
}

/// Build an `InvalidSetting` error
fn invalid(name: &str, value: &str, reason: &str) -> LedgerError {
    LedgerError::InvalidSetting {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_defaults_match_seed_rows() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.fine_per_day, dec!(0.50));
        assert_eq!(
            settings.to_pairs().map(|(_, value)| value),
            ["14".to_string(), "0.50".to_string(), "5".to_string(), "7".to_string()]
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_from_pairs() {
        let settings = LedgerSettings::from_pairs([
            ("DefaultLoanDuration", "21"),
            ("FinePerDay", " 0.25 "),
            ("LibraryName", "Central"),
        ])
        .unwrap();

        assert_eq!(settings.default_loan_duration, 21);
        assert_eq!(settings.fine_per_day, dec!(0.25));
        assert_eq!(settings.max_book_loans, 5);
    }

    #[test]
    fn test_from_pairs_rejects_bad_values() {
        let bad_type = LedgerSettings::from_pairs([("MaxBookLoans", "many")]);
        assert!(matches!(
            bad_type,
            Err(LedgerError::InvalidSetting { ref name, .. }) if name == "MaxBookLoans"
        ));

        let negative = LedgerSettings::from_pairs([("FinePerDay", "-1.00")]);
        assert!(matches!(negative, Err(LedgerError::InvalidSetting { .. })));

        let no_loans = LedgerSettings::from_pairs([("MaxBookLoans", "0")]);
        assert!(matches!(no_loans, Err(LedgerError::InvalidSetting { .. })));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_book_loans = 2\nfine_per_day = \"1.25\"").unwrap();

        let settings = LedgerSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.max_book_loans, 2);
        assert_eq!(settings.fine_per_day, dec!(1.25));
        assert_eq!(settings.reservation_expiry_days, 7);
    }
}
