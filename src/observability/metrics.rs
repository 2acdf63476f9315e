//! Metrics for the board sync and normalization phases.
//!
//! Recording goes through the `metrics` facade; with no recorder installed
//! every call is a no-op, which is what tests and the offline commands get.

use std::fmt;
use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Board fetch metrics
    FetchRequestsSuccess,
    FetchRequestsError,
    FetchRequestDuration,
    FetchItems,

    // Normalize metrics
    NormalizeRecordsProcessed,
    NormalizeFieldsCorrected,
    NormalizeColumnsDropped,
    NormalizeBatchSize,

    // Analysis metrics
    AnalysisPlansEvaluated,
    AnalysisPlansRejected,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchRequestsSuccess => "skylark_fetch_requests_success_total",
            MetricName::FetchRequestsError => "skylark_fetch_requests_error_total",
            MetricName::FetchRequestDuration => "skylark_fetch_request_duration_seconds",
            MetricName::FetchItems => "skylark_fetch_items_total",
            MetricName::NormalizeRecordsProcessed => "skylark_normalize_records_processed_total",
            MetricName::NormalizeFieldsCorrected => "skylark_normalize_fields_corrected_total",
            MetricName::NormalizeColumnsDropped => "skylark_normalize_columns_dropped_total",
            MetricName::NormalizeBatchSize => "skylark_normalize_batch_size",
            MetricName::AnalysisPlansEvaluated => "skylark_analysis_plans_evaluated_total",
            MetricName::AnalysisPlansRejected => "skylark_analysis_plans_rejected_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder with an HTTP scrape endpoint
pub fn init(listen: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new().with_http_listener(listen).install()?;
    Ok(())
}

pub mod fetch {
    use super::MetricName;

    pub fn request_success(dataset: &str) {
        ::metrics::counter!(MetricName::FetchRequestsSuccess.as_str(), "dataset" => dataset.to_string()).increment(1);
    }

    pub fn request_error(dataset: &str) {
        ::metrics::counter!(MetricName::FetchRequestsError.as_str(), "dataset" => dataset.to_string()).increment(1);
    }

    pub fn request_duration(secs: f64) {
        ::metrics::histogram!(MetricName::FetchRequestDuration.as_str()).record(secs);
    }

    pub fn items_fetched(dataset: &str, count: usize) {
        ::metrics::counter!(MetricName::FetchItems.as_str(), "dataset" => dataset.to_string()).increment(count as u64);
    }
}

pub mod normalize {
    use super::MetricName;
    use crate::pipeline::processing::audit::NormalizationReport;

    /// Record the totals of a finished run
    pub fn run_completed(report: &NormalizationReport) {
        let dataset = report.dataset.clone();
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str(), "dataset" => dataset.clone())
            .increment(report.rows as u64);
        ::metrics::counter!(
            MetricName::NormalizeFieldsCorrected.as_str(),
            "dataset" => dataset.clone(),
            "reason" => "unparseable"
        )
        .increment(report.unparseable as u64);
        ::metrics::counter!(
            MetricName::NormalizeFieldsCorrected.as_str(),
            "dataset" => dataset.clone(),
            "reason" => "magnitude_sanity_violation"
        )
        .increment(report.sanity_violations as u64);
        ::metrics::counter!(MetricName::NormalizeColumnsDropped.as_str(), "dataset" => dataset)
            .increment(report.dropped_columns as u64);
        ::metrics::histogram!(MetricName::NormalizeBatchSize.as_str()).record(report.rows as f64);
    }
}

pub mod analysis {
    use super::MetricName;

    pub fn plan_evaluated() {
        ::metrics::counter!(MetricName::AnalysisPlansEvaluated.as_str()).increment(1);
    }

    pub fn plan_rejected() {
        ::metrics::counter!(MetricName::AnalysisPlansRejected.as_str()).increment(1);
    }
}
