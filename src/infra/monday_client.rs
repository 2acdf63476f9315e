use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::BoardSourcePort;
use crate::config::MondayConfig;
use crate::error::{AnalystError, Result};
use crate::observability::metrics::fetch;
use crate::pipeline::ingestion::board::{
    first_page_request, next_page_request, parse_first_page, parse_next_page,
};
use crate::pipeline::ingestion::RawBoard;

/// monday.com v2 GraphQL client
pub struct MondayClient {
    client: reqwest::Client,
    api_url: String,
    page_limit: u32,
    max_items: usize,
}

impl MondayClient {
    pub fn new(config: &MondayConfig) -> Result<Self> {
        let token = config.token()?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(token)
            .map_err(|e| AnalystError::Config(format!("invalid API token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static("api-version"),
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| AnalystError::Config(format!("invalid API version: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            page_limit: config.page_limit,
            max_items: config.max_items,
        })
    }

    async fn post(&self, body: &Value) -> Result<Value> {
        let started = Instant::now();
        let response = self.client.post(&self.api_url).json(body).send().await?;
        let status = response.status();
        let body = response.text().await?;
        fetch::request_duration(started.elapsed().as_secs_f64());

        if !status.is_success() {
            // A GraphQL error body is surfaced by the parser with its own message
            return serde_json::from_str::<Value>(&body)
                .ok()
                .filter(|payload| payload.get("errors").is_some() || payload.get("error_message").is_some())
                .ok_or_else(|| AnalystError::Api {
                    message: format!("HTTP {}", status),
                });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BoardSourcePort for MondayClient {
    #[instrument(skip(self))]
    async fn fetch_board(&self, board_id: &str) -> Result<RawBoard> {
        let body = self.post(&first_page_request(board_id, self.page_limit)).await?;
        let (name, columns, first) = parse_first_page(&body)?;

        let mut rows = first.rows;
        let mut cursor = first.cursor;
        while let Some(next) = cursor.take() {
            if rows.len() >= self.max_items {
                warn!(max_items = self.max_items, "Stopping board fetch at item limit");
                break;
            }
            debug!(fetched = rows.len(), "Fetching next items page");
            let body = self.post(&next_page_request(&next, self.page_limit)).await?;
            let page = parse_next_page(&body, &columns)?;
            rows.extend(page.rows);
            cursor = page.cursor;
        }
        rows.truncate(self.max_items);

        info!(items = rows.len(), "Fetched board");
        Ok(RawBoard {
            board_id: board_id.to_string(),
            name,
            columns: columns.titles(),
            rows,
        })
    }
}
