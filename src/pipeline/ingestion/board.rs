//! monday.com board payloads and their conversion into raw rows.
//!
//! The GraphQL documents use variables for board ids, cursors and limits so
//! nothing caller-supplied is ever spliced into query text.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::constants::ITEM_NAME_COLUMN;
use crate::error::{AnalystError, Result};
use crate::pipeline::processing::normalize::{RawRow, RawValue};

pub const FIRST_PAGE_QUERY: &str = r#"query ($ids: [ID!], $limit: Int!) {
  boards (ids: $ids) {
    name
    columns { id title }
    items_page (limit: $limit) {
      cursor
      items { name column_values { id text } }
    }
  }
}"#;

pub const NEXT_PAGE_QUERY: &str = r#"query ($cursor: String!, $limit: Int!) {
  next_items_page (limit: $limit, cursor: $cursor) {
    cursor
    items { name column_values { id text } }
  }
}"#;

/// Request body for the first page of a board
pub fn first_page_request(board_id: &str, limit: u32) -> Value {
    json!({
        "query": FIRST_PAGE_QUERY,
        "variables": { "ids": [board_id], "limit": limit }
    })
}

/// Request body for a follow-up page
pub fn next_page_request(cursor: &str, limit: u32) -> Value {
    json!({
        "query": NEXT_PAGE_QUERY,
        "variables": { "cursor": cursor, "limit": limit }
    })
}

/// All raw rows of one board with its column titles in board order
#[derive(Debug, Clone, PartialEq)]
pub struct RawBoard {
    pub board_id: String,
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Column id to title mapping taken from the first page
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumns {
    entries: Vec<(String, String)>,
}

impl BoardColumns {
    /// Titles as emitted on every row, item name first
    pub fn titles(&self) -> Vec<String> {
        std::iter::once(ITEM_NAME_COLUMN.to_string())
            .chain(self.entries.iter().map(|(_, title)| title.clone()))
            .collect()
    }
}

/// One page of items plus the cursor for the next one
#[derive(Debug, Clone, PartialEq)]
pub struct BoardPage {
    pub cursor: Option<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardNode>,
}

#[derive(Debug, Deserialize)]
struct BoardNode {
    name: Option<String>,
    columns: Vec<ColumnNode>,
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct ColumnNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct NextPageData {
    next_items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    cursor: Option<String>,
    items: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    name: String,
    column_values: Vec<ColumnValueNode>,
}

#[derive(Debug, Deserialize)]
struct ColumnValueNode {
    id: String,
    text: Option<String>,
}

fn unwrap_response<T>(response: GraphQlResponse<T>) -> Result<T> {
    if let Some(first) = response.errors.into_iter().next() {
        return Err(AnalystError::Api { message: first.message });
    }
    if let Some(message) = response.error_message {
        return Err(AnalystError::Api { message });
    }
    response.data.ok_or_else(|| AnalystError::Api {
        message: "response carried no data".to_string(),
    })
}

/// Parse the first-page response: board metadata plus the first items
pub fn parse_first_page(body: &Value) -> Result<(Option<String>, BoardColumns, BoardPage)> {
    let response: GraphQlResponse<BoardsData> = serde_json::from_value(body.clone())?;
    let data = unwrap_response(response)?;
    let board = data.boards.into_iter().next().ok_or_else(|| AnalystError::Api {
        message: "board not found or not accessible".to_string(),
    })?;

    // The board's own name column is emitted separately as the item name
    let entries = board
        .columns
        .into_iter()
        .filter(|c| !c.title.eq_ignore_ascii_case("name"))
        .map(|c| (c.id, c.title))
        .collect();
    let columns = BoardColumns { entries };
    let page = build_page(&columns, board.items_page);

    Ok((board.name, columns, page))
}

/// Parse a `next_items_page` response
pub fn parse_next_page(body: &Value, columns: &BoardColumns) -> Result<BoardPage> {
    let response: GraphQlResponse<NextPageData> = serde_json::from_value(body.clone())?;
    let data = unwrap_response(response)?;
    Ok(build_page(columns, data.next_items_page))
}

fn build_page(columns: &BoardColumns, page: ItemsPage) -> BoardPage {
    let rows = page
        .items
        .into_iter()
        .map(|item| item_to_row(columns, item))
        .collect();

    BoardPage {
        cursor: page.cursor.filter(|c| !c.is_empty()),
        rows,
    }
}

fn item_to_row(columns: &BoardColumns, item: ItemNode) -> RawRow {
    let mut row = RawRow::new().with(ITEM_NAME_COLUMN, item.name);
    for (id, title) in &columns.entries {
        let value = item
            .column_values
            .iter()
            .find(|v| &v.id == id)
            .and_then(|v| v.text.clone())
            .map(RawValue::Text)
            .unwrap_or(RawValue::Null);
        row.push(title.clone(), value);
    }
    row
}
