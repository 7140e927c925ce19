//! Google Sheets access: CSV snapshots, typed records and row appends.
//!
//! Reads go through the public CSV export and need no credentials. Investor
//! sheets may instead be read through the Sheets API, and writes always are;
//! both use a bearer access token.

mod amount;
mod fetcher;
mod matcher;
mod records;
mod repository;
mod writer;

pub use amount::{join_split_amount, parse_amount, parse_decimal_comma, parse_integer_digits};
pub use fetcher::{
    HttpSnapshotFetcher, SheetRef, SheetSource, SheetsApiFetcher, SnapshotFetcher, ensure_csv,
    parse_csv, parse_values,
};
pub use matcher::{codes_match, find_by_code, find_by_phone, normalize_phone, phones_match};
pub use records::{
    BalanceRecord, ContainerRecord, PROFIT_COLUMNS, ProfitEntry, Rows, integer_form,
    normalize_code, parse_balance_rows, parse_container_rows, parse_profit_rows,
};
pub use repository::{PROFIT_RANGE, SheetsRepository};
pub use writer::{ChargeEntry, GoogleSheetsWriter, SheetWriter};

use thiserror::Error;

/// Errors that can occur while talking to Google Sheets.
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed CSV export: {0}")]
    Csv(#[from] csv::Error),

    #[error("Expected a CSV export from {url}, got {content_type} (is the sheet shared?)")]
    NotCsv { url: String, content_type: String },

    #[error("Malformed Sheets API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sheets API rejected append to '{worksheet}': {status} {body}")]
    AppendRejected {
        worksheet: String,
        status: u16,
        body: String,
    },

    #[error("Invalid sheet reference: {0}")]
    InvalidReference(String),

    #[error("Sheet writes are disabled (SHEETS_ACCESS_TOKEN not set)")]
    WritesDisabled,
}
