use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::dataset::NormalizedDataset;
use crate::pipeline::ingestion::RawBoard;

/// Where raw board rows come from
#[async_trait]
pub trait BoardSourcePort: Send + Sync {
    async fn fetch_board(&self, board_id: &str) -> Result<RawBoard>;
}

/// Where a finished normalization run goes
#[async_trait]
pub trait NormalizeOutputPort: Send + Sync {
    async fn write_dataset(&self, dataset: &NormalizedDataset) -> Result<()>;
}
