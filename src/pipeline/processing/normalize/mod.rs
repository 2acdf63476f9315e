use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod currency;
pub mod header;
pub mod policy;
pub mod raw;
pub mod schema;

pub use currency::parse_currency;
pub use header::normalize_header;
pub use policy::SanityPolicy;
pub use raw::{RawField, RawRow, RawValue};
pub use schema::{ColumnKeywords, ColumnKind, DatasetSchema};

use crate::error::Result;

/// A typed cell value after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Decimal(Decimal),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Missing => write!(f, "(missing)"),
        }
    }
}

/// Why the normalizer replaced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectionReason {
    #[serde(rename = "unparseable")]
    Unparseable,
    #[serde(rename = "magnitude sanity violation")]
    MagnitudeSanityViolation,
}

impl CorrectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionReason::Unparseable => "unparseable",
            CorrectionReason::MagnitudeSanityViolation => "magnitude sanity violation",
        }
    }
}

impl fmt::Display for CorrectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed value plus whether normalization had to change it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedField {
    pub value: FieldValue,
    pub was_corrected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_reason: Option<CorrectionReason>,
}

impl NormalizedField {
    pub fn missing() -> Self {
        Self::unchanged(FieldValue::Missing)
    }

    pub fn decimal(value: Decimal) -> Self {
        Self::unchanged(FieldValue::Decimal(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::unchanged(FieldValue::Text(value.into()))
    }

    pub fn corrected(value: FieldValue, reason: CorrectionReason) -> Self {
        Self {
            value,
            was_corrected: true,
            correction_reason: Some(reason),
        }
    }

    fn unchanged(value: FieldValue) -> Self {
        Self {
            value,
            was_corrected: false,
            correction_reason: None,
        }
    }
}

/// One normalized row. Columns follow the dataset schema's order and every
/// schema column is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: IndexMap<String, NormalizedField>,
    /// Source columns with no place in the schema
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dropped_columns: Vec<String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&NormalizedField> {
        self.fields.get(column)
    }

    pub fn value(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column).map(|f| &f.value)
    }

    pub fn decimal(&self, column: &str) -> Option<Decimal> {
        self.value(column).and_then(FieldValue::as_decimal)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.value(column).and_then(FieldValue::as_text)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &NormalizedField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn corrected_fields(&self) -> impl Iterator<Item = (&str, &NormalizedField)> {
        self.fields().filter(|(_, field)| field.was_corrected)
    }

    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Pass a text column through untouched; only emptiness becomes `Missing`
pub fn normalize_text(raw: &RawValue) -> NormalizedField {
    match raw {
        RawValue::Null => NormalizedField::missing(),
        RawValue::Text(s) if s.trim().is_empty() => NormalizedField::missing(),
        RawValue::Text(s) => NormalizedField::text(s.clone()),
        RawValue::Number(n) => NormalizedField::text(n.to_string()),
    }
}

/// Turn one raw row into a `Record` over `schema`.
///
/// Absent schema columns become `Missing`. Source columns outside the schema,
/// and later columns that collide with an earlier one after header
/// normalization, are dropped and listed on the record.
pub fn normalize_record(raw_row: &RawRow, schema: &DatasetSchema, policy: &SanityPolicy) -> Record {
    let mut fields: IndexMap<String, NormalizedField> = schema
        .column_names()
        .map(|name| (name.to_string(), NormalizedField::missing()))
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut dropped_columns = Vec::new();

    for raw_field in raw_row.fields() {
        let name = normalize_header(&raw_field.column);

        let Some(kind) = schema.kind(&name) else {
            debug!(column = %raw_field.column, "Dropping column outside schema");
            dropped_columns.push(name);
            continue;
        };

        if !seen.insert(name.clone()) {
            debug!(column = %raw_field.column, "Dropping duplicate column");
            dropped_columns.push(name);
            continue;
        }

        let field = match kind {
            ColumnKind::Currency => parse_currency(&raw_field.value, policy),
            ColumnKind::Text => normalize_text(&raw_field.value),
        };
        fields.insert(name, field);
    }

    Record {
        fields,
        dropped_columns,
    }
}

/// Trait for turning raw rows into records
pub trait Normalizer {
    fn normalize(&self, raw_row: &RawRow) -> Record;

    fn normalize_all(&self, rows: &[RawRow]) -> Vec<Record> {
        rows.iter().map(|row| self.normalize(row)).collect()
    }
}

/// Schema-driven normalizer with a policy validated up front
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    schema: DatasetSchema,
    policy: SanityPolicy,
}

impl RecordNormalizer {
    /// Fails before any row is touched if the policy is malformed
    pub fn new(schema: DatasetSchema, policy: SanityPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { schema, policy })
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn policy(&self) -> &SanityPolicy {
        &self.policy
    }
}

impl Normalizer for RecordNormalizer {
    fn normalize(&self, raw_row: &RawRow) -> Record {
        normalize_record(raw_row, &self.schema, &self.policy)
    }
}
