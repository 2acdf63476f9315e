use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::header::normalize_header;
use crate::constants::{DEFAULT_EXCLUDE_KEYWORDS, DEFAULT_MONEY_KEYWORDS};

/// How a column's values are routed during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Currency,
    Text,
}

/// Header keywords used to guess which columns hold money
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeywords {
    /// Substrings of a header token that suggest an amount
    pub money: Vec<String>,
    /// Whole header tokens that veto the money guess
    pub exclude: Vec<String>,
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        Self {
            money: DEFAULT_MONEY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ColumnKeywords {
    /// Classify an already-normalized header
    pub fn classify(&self, normalized: &str) -> ColumnKind {
        let tokens: Vec<&str> = normalized.split('_').filter(|t| !t.is_empty()).collect();
        let is_money = tokens
            .iter()
            .any(|t| self.money.iter().any(|k| t.contains(k.as_str())));
        let is_excluded = tokens
            .iter()
            .any(|t| self.exclude.iter().any(|k| *t == k.as_str()));

        if is_money && !is_excluded {
            ColumnKind::Currency
        } else {
            ColumnKind::Text
        }
    }
}

/// The canonical column set of one dataset, in output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    columns: IndexMap<String, ColumnKind>,
}

impl DatasetSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller-supplied hints; the first hint for a normalized name wins
    pub fn from_hints<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnKind)>,
        S: AsRef<str>,
    {
        let mut schema = Self::new();
        for (name, kind) in hints {
            schema.add_column(name.as_ref(), kind);
        }
        schema
    }

    /// Guess column kinds from the source headers
    pub fn infer<I, S>(headers: I, keywords: &ColumnKeywords) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schema = Self::new();
        for header in headers {
            let name = normalize_header(header.as_ref());
            let kind = keywords.classify(&name);
            schema.columns.entry(name).or_insert(kind);
        }
        schema
    }

    pub fn with_column(mut self, name: &str, kind: ColumnKind) -> Self {
        self.add_column(name, kind);
        self
    }

    fn add_column(&mut self, name: &str, kind: ColumnKind) {
        self.columns.entry(normalize_header(name)).or_insert(kind);
    }

    /// Replace inferred kinds with explicit hints for columns already present
    pub fn with_overrides(mut self, hints: &HashMap<String, ColumnKind>) -> Self {
        for (name, kind) in hints {
            if let Some(existing) = self.columns.get_mut(&normalize_header(name)) {
                *existing = *kind;
            }
        }
        self
    }

    pub fn kind(&self, normalized: &str) -> Option<ColumnKind> {
        self.columns.get(normalized).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn currency_columns(&self) -> impl Iterator<Item = &str> {
        self.columns()
            .filter(|(_, kind)| *kind == ColumnKind::Currency)
            .map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
