pub mod monday_client;
pub mod normalize_output_adapter;
