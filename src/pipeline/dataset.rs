use serde::{Deserialize, Serialize};

use crate::pipeline::processing::audit::{audit_records, NormalizationReport, RowAudit};
use crate::pipeline::processing::normalize::{DatasetSchema, Normalizer, RawRow, Record, RecordNormalizer};

/// Output of one normalization run: the records, the parallel audit list
/// and the run totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDataset {
    pub schema: DatasetSchema,
    pub records: Vec<Record>,
    pub audits: Vec<RowAudit>,
    pub report: NormalizationReport,
}

impl NormalizedDataset {
    pub fn from_raw_rows(label: &str, normalizer: &RecordNormalizer, rows: &[RawRow]) -> Self {
        let records = normalizer.normalize_all(rows);
        let audits = audit_records(&records);
        let report = NormalizationReport::from_audits(label, &audits);

        Self {
            schema: normalizer.schema().clone(),
            records,
            audits,
            report,
        }
    }

    pub fn label(&self) -> &str {
        &self.report.dataset
    }

    pub fn flagged_audits(&self) -> impl Iterator<Item = &RowAudit> {
        self.audits.iter().filter(|a| !a.is_clean())
    }
}
