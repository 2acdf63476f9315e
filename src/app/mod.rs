pub mod ports;
pub mod normalize_use_case;
pub mod query_use_case;
