use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid sanity policy: {0}")]
    InvalidPolicy(String),

    #[error("Board API error: {message}")]
    Api { message: String },

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Analysis plan error: {0}")]
    Plan(String),
}

pub type Result<T> = std::result::Result<T, AnalystError>;
