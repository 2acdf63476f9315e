use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::{
    DEALS_BOARD_ID_ENV, DEALS_DATASET, DEFAULT_MAX_ITEMS, DEFAULT_PAGE_LIMIT, DEFAULT_TIMEOUT_SECONDS,
    MONDAY_API_URL, MONDAY_API_URL_ENV, MONDAY_API_VERSION, MONDAY_TOKEN_ENV, WORK_ORDERS_DATASET,
    WO_BOARD_ID_ENV,
};
use crate::error::{AnalystError, Result};
use crate::pipeline::processing::normalize::{ColumnKeywords, ColumnKind, SanityPolicy};

/// Process-wide configuration, built once at startup and passed down
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monday: MondayConfig,
    pub boards: BoardIds,
    pub sanity: SanityPolicy,
    pub columns: ColumnsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MondayConfig {
    pub api_url: String,
    pub api_version: String,
    pub page_limit: u32,
    pub max_items: usize,
    pub timeout_seconds: u64,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for MondayConfig {
    fn default() -> Self {
        Self {
            api_url: MONDAY_API_URL.to_string(),
            api_version: MONDAY_API_VERSION.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            max_items: DEFAULT_MAX_ITEMS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            api_token: None,
        }
    }
}

impl MondayConfig {
    pub fn token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| AnalystError::Config(format!("{} is not set", MONDAY_TOKEN_ENV)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoardIds {
    pub deals: Option<String>,
    pub work_orders: Option<String>,
}

/// Column typing: keyword inference plus explicit per-column hints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    #[serde(flatten)]
    pub keywords: ColumnKeywords,
    pub hints: HashMap<String, ColumnKind>,
}

impl AppConfig {
    /// Read the optional TOML file, then overlay the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    AnalystError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from an environment lookup; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get(MONDAY_TOKEN_ENV) {
            self.monday.api_token = Some(token);
        }
        if let Some(url) = get(MONDAY_API_URL_ENV) {
            self.monday.api_url = url;
        }
        if let Some(id) = get(DEALS_BOARD_ID_ENV) {
            self.boards.deals = Some(id);
        }
        if let Some(id) = get(WO_BOARD_ID_ENV) {
            self.boards.work_orders = Some(id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.sanity.validate()?;

        if self.monday.page_limit == 0 {
            return Err(AnalystError::Config("monday.page_limit must be positive".to_string()));
        }
        for id in [&self.boards.deals, &self.boards.work_orders].into_iter().flatten() {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(AnalystError::Config(format!("board id '{}' must be numeric", id)));
            }
        }
        Ok(())
    }

    /// Board id configured for a dataset label
    pub fn board_id(&self, dataset: &str) -> Result<&str> {
        let (id, env) = match dataset {
            DEALS_DATASET => (&self.boards.deals, DEALS_BOARD_ID_ENV),
            WORK_ORDERS_DATASET => (&self.boards.work_orders, WO_BOARD_ID_ENV),
            other => return Err(AnalystError::Config(format!("unknown dataset '{}'", other))),
        };
        id.as_deref()
            .ok_or_else(|| AnalystError::Config(format!("{} is not set", env)))
    }
}
