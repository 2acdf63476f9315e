use anyhow::Result;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use tempfile::tempdir;

use skylark_bi::app::ports::NormalizeOutputPort;
use skylark_bi::app::query_use_case::QueryUseCase;
use skylark_bi::analysis::AnalysisResult;
use skylark_bi::infra::normalize_output_adapter::{read_records, FileNormalizeOutputAdapter};
use skylark_bi::pipeline::processing::normalize::{
    normalize_record, ColumnKeywords, ColumnKind, CorrectionReason, DatasetSchema, FieldValue, RawRow,
    RecordNormalizer, SanityPolicy,
};
use skylark_bi::pipeline::NormalizedDataset;

fn deal_schema() -> DatasetSchema {
    DatasetSchema::from_hints([("Deal Value", ColumnKind::Currency)])
}

fn trillion_policy() -> SanityPolicy {
    SanityPolicy::default().with_max_plausible_magnitude(Decimal::from(1_000_000_000_000i64))
}

fn row(value: serde_json::Value) -> RawRow {
    serde_json::from_value(json!({ "Deal Value": value })).unwrap()
}

#[test]
fn test_formatted_amount_is_parsed_without_correction() {
    let record = normalize_record(&row(json!("$1,234.50")), &deal_schema(), &trillion_policy());

    let field = record.get("deal_value").unwrap();
    assert_eq!(field.value, FieldValue::Decimal(Decimal::from_str("1234.50").unwrap()));
    assert!(!field.was_corrected);
    assert_eq!(field.correction_reason, None);
}

#[test]
fn test_id_like_amount_is_zeroed_and_flagged() {
    let record = normalize_record(&row(json!("9999999999999999")), &deal_schema(), &trillion_policy());

    let field = record.get("deal_value").unwrap();
    assert_eq!(field.value, FieldValue::Decimal(Decimal::ZERO));
    assert!(field.was_corrected);
    assert_eq!(field.correction_reason, Some(CorrectionReason::MagnitudeSanityViolation));
    assert_eq!(field.correction_reason.unwrap().to_string(), "magnitude sanity violation");
}

#[test]
fn test_null_amount_is_missing_without_correction() {
    let record = normalize_record(&row(json!(null)), &deal_schema(), &trillion_policy());

    let field = record.get("deal_value").unwrap();
    assert_eq!(field.value, FieldValue::Missing);
    assert!(!field.was_corrected);
}

#[test]
fn test_board_like_rows_with_inferred_schema() {
    let rows: Vec<RawRow> = serde_json::from_value(json!([
        {"Item Name": "Pipeline survey", "Sector": "Mining", "Deal Value": "₹ 12,00,000", "Deal Stage": "Won"},
        {"Item Name": "Drone lease", "Sector": "Powerline", "Deal Value": "8123456789012345678", "Deal Stage": "Open"},
        {"Item Name": "Survey", "Deal Value": "TBD", "Notes": "call back"}
    ]))
    .unwrap();

    let headers = ["Item Name", "Sector", "Deal Value", "Deal Stage"];
    let schema = DatasetSchema::infer(headers, &ColumnKeywords::default());
    assert_eq!(schema.kind("deal_value"), Some(ColumnKind::Currency));
    assert_eq!(schema.kind("deal_stage"), Some(ColumnKind::Text));
    assert_eq!(schema.kind("sector"), Some(ColumnKind::Text));

    let normalizer = RecordNormalizer::new(schema, SanityPolicy::default()).unwrap();
    let dataset = NormalizedDataset::from_raw_rows("deals", &normalizer, &rows);

    assert_eq!(dataset.records[0].decimal("deal_value"), Some(Decimal::from(1_200_000)));
    assert_eq!(dataset.records[1].decimal("deal_value"), Some(Decimal::ZERO));
    assert!(dataset.records[2].value("deal_value").unwrap().is_missing());
    assert!(dataset.records[2].value("sector").unwrap().is_missing());
    assert_eq!(dataset.records[2].dropped_columns(), ["notes".to_string()]);

    assert_eq!(dataset.report.rows, 3);
    assert_eq!(dataset.report.fields_corrected, 2);
    assert_eq!(dataset.report.sanity_violations, 1);
    assert_eq!(dataset.report.unparseable, 1);
    assert_eq!(dataset.report.rows_with_corrections, 2);
}

#[tokio::test]
async fn test_written_records_answer_queries() -> Result<()> {
    let dir = tempdir()?;
    let rows: Vec<RawRow> = serde_json::from_value(json!([
        {"Sector": "Mining", "Deal Value": "$1,000"},
        {"Sector": "Mining", "Deal Value": "$500"},
        {"Sector": "Railways", "Deal Value": "9999999999999999"}
    ]))?;
    let schema = DatasetSchema::from_hints([("Sector", ColumnKind::Text), ("Deal Value", ColumnKind::Currency)]);
    let normalizer = RecordNormalizer::new(schema, SanityPolicy::default())?;
    let dataset = NormalizedDataset::from_raw_rows("deals", &normalizer, &rows);

    FileNormalizeOutputAdapter::new(dir.path())?.write_dataset(&dataset).await?;

    let stored = read_records(dir.path().join("deals_records.ndjson"))?;
    assert_eq!(stored, dataset.records);

    let model_output = "```json\n{\"dataset\": \"deals\", \"group_by\": \"Sector\", \"aggregate\": {\"op\": \"sum\", \"column\": \"Deal Value\"}}\n```";
    let (_, result) = QueryUseCase::new(dir.path()).run(model_output)?;

    match result {
        AnalysisResult::Grouped { groups } => {
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].key, "Mining");
            assert_eq!(groups[0].value, Some(Decimal::from(1500)));
            assert_eq!(groups[1].key, "Railways");
            assert_eq!(groups[1].value, Some(Decimal::ZERO));
        }
        other => panic!("expected grouped result, got {:?}", other),
    }
    Ok(())
}
