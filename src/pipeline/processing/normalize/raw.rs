use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// An untyped cell value exactly as the source returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawValue {
    Null,
    Text(String),
    Number(Number),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::String(s) => RawValue::Text(s),
            Value::Number(n) => RawValue::Number(n),
            // Booleans and nested structures are carried as their JSON text
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl From<RawValue> for Value {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Null => Value::Null,
            RawValue::Text(s) => Value::String(s),
            RawValue::Number(n) => Value::Number(n),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(Number::from(value))
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::Number(Number::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => RawValue::Number(n),
            None => RawValue::Text(value.to_string()),
        }
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// A raw value tagged with the source column it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub column: String,
    pub value: RawValue,
}

/// One source row, in the order the source produced its fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct RawRow {
    fields: Vec<RawField>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and adapters
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.push(RawField {
            column: column.into(),
            value: value.into(),
        });
    }

    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|f| f.column == column)
            .map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .map(|(column, value)| RawField {
                column,
                value: value.into(),
            })
            .collect();
        Self { fields }
    }
}

impl From<RawRow> for Map<String, Value> {
    fn from(row: RawRow) -> Self {
        row.fields
            .into_iter()
            .map(|f| (f.column, Value::from(f.value)))
            .collect()
    }
}
