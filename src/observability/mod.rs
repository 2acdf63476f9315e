// Observability: metrics for fetch, normalization and analysis

pub mod metrics;

pub use metrics::{init, MetricName};
