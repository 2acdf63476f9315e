use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Number;

use super::policy::SanityPolicy;
use super::raw::RawValue;
use super::{CorrectionReason, FieldValue, NormalizedField};

/// Coerce a raw cell into a currency amount under `policy`.
///
/// Never fails: empty input is `Missing`, text that cannot be read as a
/// number is a flagged `Missing`, and any amount whose absolute value is
/// above `policy.max_plausible_magnitude` is replaced (zero or `Missing`)
/// and flagged. The last rule keeps row ids and phone numbers that land in
/// a money column from turning into quintillion-dollar deals.
pub fn parse_currency(raw: &RawValue, policy: &SanityPolicy) -> NormalizedField {
    match raw {
        RawValue::Null => NormalizedField::missing(),
        RawValue::Number(n) => parse_number(n, policy),
        RawValue::Text(text) => parse_text(text, policy),
    }
}

fn parse_number(number: &Number, policy: &SanityPolicy) -> NormalizedField {
    let repr = number.to_string();
    match parse_decimal(&repr) {
        Some(value) => check_parsed(value, &repr, policy),
        None => parse_overflow(&repr, policy),
    }
}

fn parse_text(text: &str, policy: &SanityPolicy) -> NormalizedField {
    if text.trim().is_empty() {
        return NormalizedField::missing();
    }

    let cleaned = clean_currency_text(text, policy);
    if cleaned.is_empty() {
        return NormalizedField::corrected(FieldValue::Missing, CorrectionReason::Unparseable);
    }

    match parse_decimal(&cleaned) {
        Some(value) => check_parsed(value, &cleaned, policy),
        None => parse_overflow(&cleaned, policy),
    }
}

/// Strip currency symbols, whitespace and thousands separators.
///
/// When a `.` appears before the last `,` (`1.234,50`) the text is read as
/// decimal-comma locale: dots are grouping and the comma is the point.
pub(crate) fn clean_currency_text(text: &str, policy: &SanityPolicy) -> String {
    let mut cleaned = text.trim().to_string();
    for symbol in policy.symbols_longest_first() {
        // Separators are resolved below, once the locale is known
        if symbol.chars().all(|c| c == ',') {
            continue;
        }
        if cleaned.contains(symbol) {
            cleaned = cleaned.replace(symbol, "");
        }
    }
    cleaned.retain(|c| !c.is_whitespace());

    let decimal_comma = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => comma > dot,
        _ => false,
    };

    if decimal_comma {
        cleaned.retain(|c| c != '.');
        cleaned.replace(',', ".")
    } else {
        cleaned.retain(|c| c != ',');
        cleaned
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// Text that is a number but out of `Decimal` range is an implausible
/// amount, not garbage. That includes literals too large even for `f64`.
fn parse_overflow(text: &str, policy: &SanityPolicy) -> NormalizedField {
    let parsed = match text.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(v) if v.is_infinite() && is_numeric_literal(text) => return sanity_violation(policy),
        _ => return NormalizedField::corrected(FieldValue::Missing, CorrectionReason::Unparseable),
    };

    let max = policy.max_plausible_magnitude.to_f64().unwrap_or(f64::MAX);
    if parsed.abs() > max {
        return sanity_violation(policy);
    }

    match Decimal::from_f64(parsed) {
        Some(value) => check_parsed(value, text, policy),
        None => NormalizedField::corrected(FieldValue::Missing, CorrectionReason::Unparseable),
    }
}

/// Digits with optional sign, point and exponent; rejects `inf` and `nan`
fn is_numeric_literal(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

/// A nonzero mantissa that came out as zero fell below `Decimal`'s 28
/// fractional digits
fn underflowed(text: &str, value: Decimal) -> bool {
    let mantissa = text.split(|c: char| c == 'e' || c == 'E').next().unwrap_or(text);
    value.is_zero() && mantissa.chars().any(|c| matches!(c, '1'..='9'))
}

fn check_parsed(value: Decimal, text: &str, policy: &SanityPolicy) -> NormalizedField {
    if underflowed(text, value) {
        return NormalizedField::corrected(FieldValue::Missing, CorrectionReason::Unparseable);
    }
    check_magnitude(value, policy)
}

fn check_magnitude(value: Decimal, policy: &SanityPolicy) -> NormalizedField {
    if value.abs() > policy.max_plausible_magnitude {
        sanity_violation(policy)
    } else {
        NormalizedField::decimal(value)
    }
}

fn sanity_violation(policy: &SanityPolicy) -> NormalizedField {
    let value = if policy.zero_on_violation {
        FieldValue::Decimal(Decimal::ZERO)
    } else {
        FieldValue::Missing
    };
    NormalizedField::corrected(value, CorrectionReason::MagnitudeSanityViolation)
}
