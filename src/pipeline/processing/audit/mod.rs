use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::processing::normalize::{CorrectionReason, Record};

/// A single field the normalizer had to change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCorrection {
    pub column: String,
    pub reason: CorrectionReason,
}

/// Correction flags for one row, parallel to the record list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowAudit {
    pub row_index: usize,
    pub corrections: Vec<FieldCorrection>,
    pub dropped_columns: Vec<String>,
}

impl RowAudit {
    pub fn from_record(row_index: usize, record: &Record) -> Self {
        let corrections = record
            .corrected_fields()
            .filter_map(|(column, field)| {
                field.correction_reason.map(|reason| FieldCorrection {
                    column: column.to_string(),
                    reason,
                })
            })
            .collect();

        Self {
            row_index,
            corrections,
            dropped_columns: record.dropped_columns().to_vec(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty() && self.dropped_columns.is_empty()
    }
}

/// Build the audit list for a batch of records
pub fn audit_records(records: &[Record]) -> Vec<RowAudit> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| RowAudit::from_record(index, record))
        .collect()
}

/// Totals for one normalization run, surfaced to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub run_id: Uuid,
    pub dataset: String,
    pub normalized_at: DateTime<Utc>,
    pub rows: usize,
    pub rows_with_corrections: usize,
    pub fields_corrected: usize,
    pub unparseable: usize,
    pub sanity_violations: usize,
    pub dropped_columns: usize,
}

impl NormalizationReport {
    pub fn from_audits(dataset: &str, audits: &[RowAudit]) -> Self {
        let mut report = Self {
            run_id: Uuid::new_v4(),
            dataset: dataset.to_string(),
            normalized_at: Utc::now(),
            rows: audits.len(),
            rows_with_corrections: 0,
            fields_corrected: 0,
            unparseable: 0,
            sanity_violations: 0,
            dropped_columns: 0,
        };

        for audit in audits {
            if !audit.corrections.is_empty() {
                report.rows_with_corrections += 1;
            }
            report.fields_corrected += audit.corrections.len();
            report.dropped_columns += audit.dropped_columns.len();
            for correction in &audit.corrections {
                match correction.reason {
                    CorrectionReason::Unparseable => report.unparseable += 1,
                    CorrectionReason::MagnitudeSanityViolation => report.sanity_violations += 1,
                }
            }
        }

        report
    }

    /// Total flagged items: corrected fields plus dropped columns
    pub fn flagged(&self) -> usize {
        self.fields_corrected + self.dropped_columns
    }
}

impl fmt::Display for NormalizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows, {} fields corrected ({} unparseable, {} magnitude sanity violations), {} dropped columns",
            self.dataset,
            self.rows,
            self.fields_corrected,
            self.unparseable,
            self.sanity_violations,
            self.dropped_columns
        )
    }
}
