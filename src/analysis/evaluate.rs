use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use super::plan::{AggregateOp, AnalysisPlan, Filter, FilterOp};
use crate::error::{AnalystError, Result};
use crate::observability::metrics::analysis;
use crate::pipeline::processing::normalize::{normalize_header, FieldValue, Record};

const MISSING_GROUP: &str = "(missing)";

/// Outcome of evaluating a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Scalar { value: Option<Decimal> },
    Grouped { groups: Vec<GroupValue> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub key: String,
    pub value: Option<Decimal>,
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(value: &Option<Decimal>) -> String {
            value.map(|v| v.normalize().to_string()).unwrap_or_else(|| "n/a".to_string())
        }
        match self {
            AnalysisResult::Scalar { value } => write!(f, "{}", render(value)),
            AnalysisResult::Grouped { groups } => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}: {}", group.key, render(&group.value))?;
                }
                Ok(())
            }
        }
    }
}

/// A filter with its column resolved and operand pre-parsed
struct CompiledFilter {
    column: String,
    op: FilterOp,
    text: Option<String>,
    number: Option<Decimal>,
}

impl CompiledFilter {
    fn compile(filter: &Filter) -> Result<Self> {
        let text = filter.operand_text();
        let number = text.as_deref().and_then(|t| Decimal::from_str(t.trim()).ok());
        if filter.op.is_numeric() && number.is_none() {
            return Err(AnalystError::Plan(format!(
                "filter {:?} on '{}' needs a numeric value",
                filter.op, filter.column
            )));
        }
        Ok(Self {
            column: normalize_header(&filter.column),
            op: filter.op,
            text: text.map(|t| t.to_lowercase()),
            number,
        })
    }

    fn matches(&self, record: &Record) -> bool {
        let value = record.value(&self.column).unwrap_or(&FieldValue::Missing);
        match self.op {
            FilterOp::IsMissing => value.is_missing(),
            FilterOp::IsPresent => !value.is_missing(),
            FilterOp::Contains => match (value, &self.text) {
                (FieldValue::Missing, _) | (_, None) => false,
                (v, Some(needle)) => v.to_string().to_lowercase().contains(needle.as_str()),
            },
            FilterOp::Equals => self.equals(value),
            FilterOp::NotEquals => !self.equals(value),
            FilterOp::GreaterThan => matches!((value, self.number), (FieldValue::Decimal(v), Some(n)) if *v > n),
            FilterOp::LessThan => matches!((value, self.number), (FieldValue::Decimal(v), Some(n)) if *v < n),
        }
    }

    fn equals(&self, value: &FieldValue) -> bool {
        match (value, self.number, &self.text) {
            (FieldValue::Decimal(v), Some(n), _) => *v == n,
            (FieldValue::Missing, _, _) => false,
            (v, _, Some(text)) => v.to_string().to_lowercase() == *text,
            (_, _, None) => false,
        }
    }
}

/// Run `plan` over `records`. Unknown columns are rejected; missing values
/// are skipped by numeric aggregates.
pub fn evaluate(plan: &AnalysisPlan, records: &[Record]) -> Result<AnalysisResult> {
    let result = evaluate_inner(plan, records);
    match &result {
        Ok(_) => analysis::plan_evaluated(),
        Err(_) => analysis::plan_rejected(),
    }
    result
}

fn evaluate_inner(plan: &AnalysisPlan, records: &[Record]) -> Result<AnalysisResult> {
    plan.validate()?;

    let filters = plan
        .filters
        .iter()
        .map(CompiledFilter::compile)
        .collect::<Result<Vec<_>>>()?;
    let group_by = plan.group_by.as_deref().map(normalize_header);
    let aggregate_column = plan.aggregate.column.as_deref().map(normalize_header);

    if let Some(first) = records.first() {
        let known: HashSet<&str> = first.columns().collect();
        let referenced = filters
            .iter()
            .map(|f| f.column.as_str())
            .chain(group_by.as_deref())
            .chain(aggregate_column.as_deref());
        for column in referenced {
            if !known.contains(column) {
                return Err(AnalystError::Plan(format!("unknown column '{}'", column)));
            }
        }
    }

    for filter in filters.iter().filter(|f| f.op.is_numeric()) {
        ensure_numeric(&filter.column, records)?;
    }
    if plan.aggregate.op != AggregateOp::Count {
        if let Some(column) = aggregate_column.as_deref() {
            ensure_numeric(column, records)?;
        }
    }

    let selected: Vec<&Record> = records
        .iter()
        .filter(|r| filters.iter().all(|f| f.matches(r)))
        .collect();

    let op = plan.aggregate.op;
    let column = aggregate_column.as_deref();

    match group_by {
        None => Ok(AnalysisResult::Scalar {
            value: aggregate(op, column, &selected)?,
        }),
        Some(group_column) => {
            let mut buckets: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
            for record in selected {
                let key = match record.value(&group_column) {
                    Some(FieldValue::Missing) | None => MISSING_GROUP.to_string(),
                    Some(v) => v.to_string(),
                };
                buckets.entry(key).or_default().push(record);
            }

            let groups = buckets
                .into_iter()
                .map(|(key, members)| {
                    Ok(GroupValue {
                        key,
                        value: aggregate(op, column, &members)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(AnalysisResult::Grouped { groups })
        }
    }
}

/// Numeric operations need a column of amounts; one holding only text is a
/// confused plan, not an empty answer
fn ensure_numeric(column: &str, records: &[Record]) -> Result<()> {
    let mut has_text = false;
    for record in records {
        match record.value(column) {
            Some(FieldValue::Decimal(_)) => return Ok(()),
            Some(FieldValue::Text(_)) => has_text = true,
            _ => {}
        }
    }

    if has_text {
        return Err(AnalystError::Plan(format!(
            "column '{}' holds text, not amounts",
            column
        )));
    }
    Ok(())
}

fn aggregate(op: AggregateOp, column: Option<&str>, records: &[&Record]) -> Result<Option<Decimal>> {
    let values: Vec<Decimal> = match column {
        Some(column) => records.iter().filter_map(|r| r.decimal(column)).collect(),
        None => Vec::new(),
    };

    let overflow = || AnalystError::Plan("aggregate overflowed".to_string());
    let value = match op {
        AggregateOp::Count => Some(Decimal::from(records.len())),
        AggregateOp::Sum => Some(checked_sum(&values).ok_or_else(overflow)?),
        AggregateOp::Mean => {
            if values.is_empty() {
                None
            } else {
                let sum = checked_sum(&values).ok_or_else(overflow)?;
                Some(sum.checked_div(Decimal::from(values.len())).ok_or_else(overflow)?)
            }
        }
        AggregateOp::Min => values.iter().copied().min(),
        AggregateOp::Max => values.iter().copied().max(),
    };
    Ok(value)
}

fn checked_sum(values: &[Decimal]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{normalize_record, ColumnKind, DatasetSchema, RawRow, SanityPolicy};

    fn records() -> Vec<Record> {
        let schema = DatasetSchema::from_hints([
            ("Item Name", ColumnKind::Text),
            ("Sector", ColumnKind::Text),
            ("Deal Value", ColumnKind::Currency),
        ]);
        let policy = SanityPolicy::default();
        [
            RawRow::new().with("Item Name", "A").with("Sector", "Mining").with("Deal Value", "$100"),
            RawRow::new().with("Item Name", "B").with("Sector", "Mining").with("Deal Value", "$300"),
            RawRow::new().with("Item Name", "C").with("Sector", "Powerline").with("Deal Value", "50"),
            RawRow::new().with("Item Name", "D").with("Deal Value", "n/a"),
        ]
        .iter()
        .map(|r| normalize_record(r, &schema, &policy))
        .collect()
    }

    fn plan(json: &str) -> AnalysisPlan {
        AnalysisPlan::from_model_text(json).unwrap()
    }

    #[test]
    fn test_sum_with_contains_filter() {
        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Sector", "op": "contains", "value": "MIN"}], "aggregate": {"op": "sum", "column": "Deal Value"}}"#);
        let result = evaluate(&p, &records()).unwrap();
        assert_eq!(result, AnalysisResult::Scalar { value: Some(Decimal::from(400)) });
    }

    #[test]
    fn test_count_and_mean_skip_missing() {
        let count = plan(r#"{"dataset": "deals", "aggregate": {"op": "count"}}"#);
        assert_eq!(evaluate(&count, &records()).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::from(4)) });

        let mean = plan(r#"{"dataset": "deals", "aggregate": {"op": "mean", "column": "deal_value"}}"#);
        assert_eq!(evaluate(&mean, &records()).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::from(150)) });
    }

    #[test]
    fn test_group_by_orders_keys_and_groups_missing() {
        let p = plan(r#"{"dataset": "deals", "group_by": "Sector", "aggregate": {"op": "max", "column": "Deal Value"}}"#);
        let result = evaluate(&p, &records()).unwrap();
        assert_eq!(
            result,
            AnalysisResult::Grouped {
                groups: vec![
                    GroupValue { key: "(missing)".to_string(), value: None },
                    GroupValue { key: "Mining".to_string(), value: Some(Decimal::from(300)) },
                    GroupValue { key: "Powerline".to_string(), value: Some(Decimal::from(50)) },
                ]
            }
        );
    }

    #[test]
    fn test_numeric_filters() {
        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Deal Value", "op": "greater_than", "value": 75}], "aggregate": {"op": "count"}}"#);
        assert_eq!(evaluate(&p, &records()).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::from(2)) });

        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Deal Value", "op": "less_than", "value": "abc"}], "aggregate": {"op": "count"}}"#);
        assert!(matches!(evaluate(&p, &records()), Err(AnalystError::Plan(_))));
    }

    #[test]
    fn test_equals_and_presence() {
        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Deal Value", "op": "equals", "value": "300.00"}], "aggregate": {"op": "count"}}"#);
        assert_eq!(evaluate(&p, &records()).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::ONE) });

        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Sector", "op": "is_missing"}], "aggregate": {"op": "count"}}"#);
        assert_eq!(evaluate(&p, &records()).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::ONE) });
    }

    #[test]
    fn test_unknown_column_rejected() {
        let p = plan(r#"{"dataset": "deals", "aggregate": {"op": "sum", "column": "Revenue"}}"#);
        let err = evaluate(&p, &records()).unwrap_err();
        assert!(err.to_string().contains("unknown column 'revenue'"));
    }

    #[test]
    fn test_numeric_operations_on_text_column_rejected() {
        let p = plan(r#"{"dataset": "deals", "aggregate": {"op": "sum", "column": "Sector"}}"#);
        let err = evaluate(&p, &records()).unwrap_err();
        assert!(err.to_string().contains("column 'sector' holds text"));

        let p = plan(r#"{"dataset": "deals", "filters": [{"column": "Item Name", "op": "greater_than", "value": 5}], "aggregate": {"op": "count"}}"#);
        assert!(matches!(evaluate(&p, &records()), Err(AnalystError::Plan(_))));

        // Counting and text filters on the same columns stay valid
        let p = plan(r#"{"dataset": "deals", "group_by": "Sector", "aggregate": {"op": "count", "column": "Sector"}}"#);
        assert!(evaluate(&p, &records()).is_ok());
    }

    #[test]
    fn test_all_missing_amounts_are_not_text() {
        let schema = DatasetSchema::from_hints([("Deal Value", ColumnKind::Currency)]);
        let records: Vec<Record> = [RawRow::new().with("Deal Value", "n/a")]
            .iter()
            .map(|r| normalize_record(r, &schema, &SanityPolicy::default()))
            .collect();

        let p = plan(r#"{"dataset": "deals", "aggregate": {"op": "max", "column": "Deal Value"}}"#);
        assert_eq!(evaluate(&p, &records).unwrap(), AnalysisResult::Scalar { value: None });
    }

    #[test]
    fn test_empty_input() {
        let p = plan(r#"{"dataset": "deals", "aggregate": {"op": "min", "column": "Deal Value"}}"#);
        assert_eq!(evaluate(&p, &[]).unwrap(), AnalysisResult::Scalar { value: None });

        let p = plan(r#"{"dataset": "deals", "aggregate": {"op": "sum", "column": "Deal Value"}}"#);
        assert_eq!(evaluate(&p, &[]).unwrap(), AnalysisResult::Scalar { value: Some(Decimal::ZERO) });
    }
}
