use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalystError, Result};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```[A-Za-z0-9_-]*\s*$").expect("fence pattern is valid"));

/// A question about one dataset, expressed over a fixed set of operations.
///
/// This is the only thing a language model may hand back for execution:
/// filters, an optional grouping column and one aggregate. There is no way
/// to express loops, I/O or calls outside this set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisPlan {
    pub dataset: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub group_by: Option<String>,
    pub aggregate: Aggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Case-insensitive substring match on the rendered value
    Contains,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    IsMissing,
    IsPresent,
}

impl FilterOp {
    pub fn needs_operand(&self) -> bool {
        !matches!(self, FilterOp::IsMissing | FilterOp::IsPresent)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FilterOp::GreaterThan | FilterOp::LessThan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregate {
    pub op: AggregateOp,
    #[serde(default)]
    pub column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl AnalysisPlan {
    /// Parse a plan from model output, tolerating markdown code fences
    pub fn from_model_text(text: &str) -> Result<Self> {
        let stripped = CODE_FENCE.replace_all(text, "");
        let plan: AnalysisPlan = serde_json::from_str(stripped.trim())
            .map_err(|e| AnalystError::Plan(format!("not a valid analysis plan: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Shape checks that do not need the data
    pub fn validate(&self) -> Result<()> {
        if self.aggregate.op != AggregateOp::Count && self.aggregate.column.is_none() {
            return Err(AnalystError::Plan(format!(
                "aggregate {:?} needs a column",
                self.aggregate.op
            )));
        }

        for filter in &self.filters {
            match (&filter.value, filter.op.needs_operand()) {
                (None, true) => {
                    return Err(AnalystError::Plan(format!(
                        "filter {:?} on '{}' needs a value",
                        filter.op, filter.column
                    )))
                }
                (Some(Value::String(_)) | Some(Value::Number(_)), _) | (None, false) => {}
                (Some(other), _) => {
                    return Err(AnalystError::Plan(format!(
                        "filter value for '{}' must be a string or number, got {}",
                        filter.column, other
                    )))
                }
            }
        }
        Ok(())
    }
}

impl Filter {
    /// The operand as text; numbers keep their JSON rendering
    pub fn operand_text(&self) -> Option<String> {
        match &self.value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
