/// Dataset labels used on the CLI and in output file names
pub const DEALS_DATASET: &str = "deals";
pub const WORK_ORDERS_DATASET: &str = "work_orders";

// Environment variable names
pub const MONDAY_TOKEN_ENV: &str = "MONDAY_TOKEN";
pub const MONDAY_API_URL_ENV: &str = "MONDAY_API_URL";
pub const DEALS_BOARD_ID_ENV: &str = "DEALS_BOARD_ID";
pub const WO_BOARD_ID_ENV: &str = "WO_BOARD_ID";

// monday.com v2 API
pub const MONDAY_API_URL: &str = "https://api.monday.com/v2";
pub const MONDAY_API_VERSION: &str = "2023-10";
pub const DEFAULT_PAGE_LIMIT: u32 = 500;
pub const DEFAULT_MAX_ITEMS: usize = 5_000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Column emitted for every board item's own name
pub const ITEM_NAME_COLUMN: &str = "Item Name";

/// Header substrings that mark a money column
pub const DEFAULT_MONEY_KEYWORDS: &[&str] = &["value", "amount", "revenue", "budget", "cost", "price"];

/// Header tokens that rule a column out as money even when a money keyword matches
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &[
    "status",
    "stage",
    "date",
    "id",
    "code",
    "name",
    "probability",
    "sector",
];

/// Symbols stripped from currency text before parsing
pub const DEFAULT_CURRENCY_SYMBOLS: &[&str] = &["$", "₹", "Rs.", "Rs", "INR", "USD", "€", "£", ","];

/// One trillion
pub const DEFAULT_MAX_PLAUSIBLE_MAGNITUDE: i64 = 1_000_000_000_000;

/// Placeholder for headers with no letters or digits
pub const UNNAMED_COLUMN: &str = "unnamed";

/// Get all supported dataset labels
pub fn get_supported_datasets() -> Vec<&'static str> {
    vec![DEALS_DATASET, WORK_ORDERS_DATASET]
}
