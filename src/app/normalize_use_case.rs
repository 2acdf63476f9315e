use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::app::ports::{BoardSourcePort, NormalizeOutputPort};
use crate::observability::metrics::{fetch, normalize};
use crate::pipeline::dataset::NormalizedDataset;
use crate::pipeline::processing::normalize::{
    ColumnKeywords, ColumnKind, DatasetSchema, RecordNormalizer, SanityPolicy,
};

/// Use case for syncing one board: fetch, normalize, audit, write
pub struct NormalizeUseCase {
    source: Box<dyn BoardSourcePort>,
    output: Box<dyn NormalizeOutputPort>,
    policy: SanityPolicy,
    keywords: ColumnKeywords,
    hints: HashMap<String, ColumnKind>,
}

impl NormalizeUseCase {
    pub fn new(
        source: Box<dyn BoardSourcePort>,
        output: Box<dyn NormalizeOutputPort>,
        policy: SanityPolicy,
    ) -> Self {
        Self {
            source,
            output,
            policy,
            keywords: ColumnKeywords::default(),
            hints: HashMap::new(),
        }
    }

    /// Use custom keyword inference and explicit column hints
    pub fn with_columns(mut self, keywords: ColumnKeywords, hints: HashMap<String, ColumnKind>) -> Self {
        self.keywords = keywords;
        self.hints = hints;
        self
    }

    /// Fetch and normalize one board, labelled `label` in output and metrics
    #[instrument(skip(self))]
    pub async fn run(&self, label: &str, board_id: &str) -> Result<NormalizedDataset> {
        let board = match self.source.fetch_board(board_id).await {
            Ok(board) => {
                fetch::request_success(label);
                fetch::items_fetched(label, board.rows.len());
                board
            }
            Err(e) => {
                fetch::request_error(label);
                return Err(e).with_context(|| format!("failed to fetch board {} ({})", board_id, label));
            }
        };

        let schema = DatasetSchema::infer(&board.columns, &self.keywords).with_overrides(&self.hints);
        info!(
            columns = schema.len(),
            currency_columns = ?schema.currency_columns().collect::<Vec<_>>(),
            "Resolved dataset schema"
        );

        let normalizer = RecordNormalizer::new(schema, self.policy.clone())?;
        let dataset = NormalizedDataset::from_raw_rows(label, &normalizer, &board.rows);

        normalize::run_completed(&dataset.report);
        if dataset.report.fields_corrected > 0 {
            warn!(report = %dataset.report, "Normalization corrected fields");
        } else {
            info!(report = %dataset.report, "Normalization finished");
        }

        self.output
            .write_dataset(&dataset)
            .await
            .context("failed to write normalized dataset")?;

        Ok(dataset)
    }
}
