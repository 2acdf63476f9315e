// Pipeline processing: normalization and correction audit

pub mod audit;
pub mod normalize;
