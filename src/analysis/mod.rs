//! Safe evaluation of analysis questions over normalized records.
//!
//! Questions arrive as a typed [`AnalysisPlan`] rather than code; the
//! evaluator only knows a fixed set of filters and aggregates.

pub mod evaluate;
pub mod plan;

pub use evaluate::{evaluate, AnalysisResult, GroupValue};
pub use plan::{Aggregate, AggregateOp, AnalysisPlan, Filter, FilterOp};
