use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CURRENCY_SYMBOLS, DEFAULT_MAX_PLAUSIBLE_MAGNITUDE};
use crate::error::{AnalystError, Result};

/// Rules applied to currency columns during normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityPolicy {
    /// Symbols removed from currency text before parsing
    pub currency_symbols: BTreeSet<String>,
    /// Largest absolute value accepted as a real amount
    pub max_plausible_magnitude: Decimal,
    /// Zero out implausible values instead of marking them missing
    pub zero_on_violation: bool,
}

impl Default for SanityPolicy {
    fn default() -> Self {
        Self {
            currency_symbols: DEFAULT_CURRENCY_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            max_plausible_magnitude: Decimal::from(DEFAULT_MAX_PLAUSIBLE_MAGNITUDE),
            zero_on_violation: true,
        }
    }
}

impl SanityPolicy {
    pub fn new<I, S>(currency_symbols: I, max_plausible_magnitude: Decimal, zero_on_violation: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let policy = Self {
            currency_symbols: currency_symbols.into_iter().map(Into::into).collect(),
            max_plausible_magnitude,
            zero_on_violation,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn with_max_plausible_magnitude(mut self, max: Decimal) -> Self {
        self.max_plausible_magnitude = max;
        self
    }

    pub fn with_zero_on_violation(mut self, zero: bool) -> Self {
        self.zero_on_violation = zero;
        self
    }

    /// Reject policies that would corrupt numbers instead of cleaning them
    pub fn validate(&self) -> Result<()> {
        if self.max_plausible_magnitude.is_sign_negative() {
            return Err(AnalystError::InvalidPolicy(format!(
                "max_plausible_magnitude must not be negative, got {}",
                self.max_plausible_magnitude
            )));
        }

        for symbol in &self.currency_symbols {
            if symbol.is_empty() {
                return Err(AnalystError::InvalidPolicy(
                    "currency symbols must not be empty".to_string(),
                ));
            }
            if symbol.chars().any(|c| c.is_ascii_digit()) {
                return Err(AnalystError::InvalidPolicy(format!(
                    "currency symbol '{}' contains digits",
                    symbol
                )));
            }
            if symbol.chars().all(|c| matches!(c, '+' | '-' | '.')) {
                return Err(AnalystError::InvalidPolicy(format!(
                    "currency symbol '{}' would strip sign or decimal point",
                    symbol
                )));
            }
        }

        Ok(())
    }

    /// Symbols ordered longest first so `Rs.` is removed before `Rs`
    pub(crate) fn symbols_longest_first(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.currency_symbols.iter().map(String::as_str).collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        symbols
    }
}
