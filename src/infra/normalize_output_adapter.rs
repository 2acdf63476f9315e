use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::app::ports::NormalizeOutputPort;
use crate::error::Result;
use crate::pipeline::dataset::NormalizedDataset;
use crate::pipeline::processing::normalize::Record;

/// Writes records as NDJSON and the run report as JSON under one directory
pub struct FileNormalizeOutputAdapter {
    output_dir: PathBuf,
}

impl FileNormalizeOutputAdapter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn records_path(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}_records.ndjson", label))
    }

    pub fn report_path(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}_report.json", label))
    }

    fn write_records(&self, dataset: &NormalizedDataset) -> Result<PathBuf> {
        let path = self.records_path(dataset.label());
        let mut writer = BufWriter::new(File::create(&path)?);
        for record in &dataset.records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn write_report(&self, dataset: &NormalizedDataset) -> Result<PathBuf> {
        let path = self.report_path(dataset.label());
        let summary = serde_json::json!({
            "report": dataset.report,
            "schema": dataset.schema,
            "flagged_rows": dataset.flagged_audits().collect::<Vec<_>>(),
        });
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        Ok(path)
    }
}

#[async_trait]
impl NormalizeOutputPort for FileNormalizeOutputAdapter {
    async fn write_dataset(&self, dataset: &NormalizedDataset) -> Result<()> {
        let records_path = self.write_records(dataset)?;
        let report_path = self.write_report(dataset)?;
        info!(
            records = %records_path.display(),
            report = %report_path.display(),
            "Wrote normalized dataset"
        );
        Ok(())
    }
}

/// Read records back from an NDJSON file written by this adapter
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<Record>(line).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{ColumnKind, DatasetSchema, RawRow, RecordNormalizer, SanityPolicy};
    use tempfile::tempdir;

    fn dataset() -> NormalizedDataset {
        let schema = DatasetSchema::from_hints([("Deal Value", ColumnKind::Currency), ("Owner", ColumnKind::Text)]);
        let normalizer = RecordNormalizer::new(schema, SanityPolicy::default()).unwrap();
        let rows = vec![
            RawRow::new().with("Deal Value", "$1,000").with("Owner", "Ana"),
            RawRow::new().with("Deal Value", "9999999999999999"),
        ];
        NormalizedDataset::from_raw_rows("deals", &normalizer, &rows)
    }

    #[tokio::test]
    async fn test_writes_records_and_report() {
        let dir = tempdir().unwrap();
        let adapter = FileNormalizeOutputAdapter::new(dir.path().join("out")).unwrap();
        let dataset = dataset();

        adapter.write_dataset(&dataset).await.unwrap();

        let records = read_records(adapter.records_path("deals")).unwrap();
        assert_eq!(records, dataset.records);

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(adapter.report_path("deals")).unwrap()).unwrap();
        assert_eq!(report["report"]["rows"], 2);
        assert_eq!(report["report"]["sanity_violations"], 1);
        assert_eq!(report["flagged_rows"].as_array().unwrap().len(), 1);
        assert_eq!(report["flagged_rows"][0]["row_index"], 1);
    }
}
