// Data pipeline: board ingestion, normalization, audit

pub mod dataset;
pub mod ingestion;
pub mod processing;

// Re-export key types from each stage
pub use dataset::NormalizedDataset;
