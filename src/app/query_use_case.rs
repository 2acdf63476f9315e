use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::analysis::{evaluate, AnalysisPlan, AnalysisResult};
use crate::constants::get_supported_datasets;
use crate::infra::normalize_output_adapter::read_records;

/// Use case for answering an analysis plan against synced data on disk
pub struct QueryUseCase {
    data_dir: PathBuf,
}

impl QueryUseCase {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Parse model output into a plan and evaluate it
    pub fn run(&self, plan_text: &str) -> Result<(AnalysisPlan, AnalysisResult)> {
        let plan = AnalysisPlan::from_model_text(plan_text)?;

        if !get_supported_datasets().iter().any(|d| *d == plan.dataset) {
            anyhow::bail!(
                "unknown dataset '{}', expected one of {:?}",
                plan.dataset,
                get_supported_datasets()
            );
        }

        let path = self.data_dir.join(format!("{}_records.ndjson", plan.dataset));
        let records = read_records(&path)
            .with_context(|| format!("failed to read records from {}", path.display()))?;
        info!(dataset = %plan.dataset, records = records.len(), "Evaluating analysis plan");

        let result = evaluate(&plan, &records)?;
        Ok((plan, result))
    }
}
