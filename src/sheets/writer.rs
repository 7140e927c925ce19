//! Appending charge rows through the Google Sheets API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::SheetsError;

/// Base URL of the Sheets API v4.
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// One charge appended to a customer's category worksheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeEntry {
    /// Date in `dd.mm.YYYY`.
    pub date: String,
    /// Uploaded file name, typically the flight or container number.
    pub source: String,
    pub description: String,
    pub amount: f64,
}

impl ChargeEntry {
    /// Cell values in column order A..D.
    fn cells(&self) -> serde_json::Value {
        json!([self.date, self.source, self.description, self.amount])
    }
}

/// Destination for charge rows.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Appends `entry` after the last row of the worksheet titled `worksheet`.
    async fn append_row(&self, worksheet: &str, entry: &ChargeEntry) -> Result<(), SheetsError>;
}

/// Writes to one spreadsheet document with a bearer access token.
pub struct GoogleSheetsWriter {
    client: reqwest::Client,
    document_id: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for GoogleSheetsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsWriter")
            .field("document_id", &self.document_id)
            .field("writes_enabled", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl GoogleSheetsWriter {
    /// Creates a writer. Without an access token every append fails with
    /// [`SheetsError::WritesDisabled`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        document_id: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SheetsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            document_id: document_id.into(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Whether appends can succeed at all.
    #[must_use]
    pub fn writes_enabled(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Worksheet title quoted for A1 notation.
#[must_use]
pub(super) fn quote_title(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

/// A1 range covering columns A..D of a worksheet.
#[must_use]
fn append_range(worksheet: &str) -> String {
    format!("{}!A:D", quote_title(worksheet))
}

/// `values` endpoint of a document for an A1 range, with `suffix` appended
/// to the range segment.
pub(super) fn values_url(
    document_id: &str,
    range: &str,
    suffix: &str,
) -> Result<reqwest::Url, SheetsError> {
    let mut url = reqwest::Url::parse(SHEETS_API_URL)
        .map_err(|e| SheetsError::InvalidReference(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| SheetsError::InvalidReference(SHEETS_API_URL.to_owned()))?
        .push(document_id)
        .push("values")
        .push(&format!("{range}{suffix}"));
    Ok(url)
}

#[async_trait]
impl SheetWriter for GoogleSheetsWriter {
    async fn append_row(&self, worksheet: &str, entry: &ChargeEntry) -> Result<(), SheetsError> {
        let token = self.access_token.as_deref().ok_or(SheetsError::WritesDisabled)?;

        let url = values_url(&self.document_id, &append_range(worksheet), ":append")?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [entry.cells()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Append to '{}' rejected with {}", worksheet, status);
            return Err(SheetsError::AppendRejected {
                worksheet: worksheet.to_owned(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!("Appended {:.2} to '{}'", entry.amount, worksheet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_range_quotes_title() {
        assert_eq!(append_range("12"), "'12'!A:D");
        assert_eq!(append_range("Ali's"), "'Ali''s'!A:D");
    }

    #[test]
    fn test_entry_cells_order() {
        let entry = ChargeEntry {
            date: "01.09.2025".to_owned(),
            source: "CN-77.csv".to_owned(),
            description: "Yuk keldi".to_owned(),
            amount: 500.0,
        };
        assert_eq!(
            entry.cells(),
            json!(["01.09.2025", "CN-77.csv", "Yuk keldi", 500.0])
        );
    }

    #[tokio::test]
    async fn test_writes_disabled_without_token() {
        let writer =
            GoogleSheetsWriter::new("doc", Some("  ".to_owned()), Duration::from_secs(1)).unwrap();
        assert!(!writer.writes_enabled());

        let entry = ChargeEntry {
            date: "01.09.2025".to_owned(),
            source: "f".to_owned(),
            description: "d".to_owned(),
            amount: 1.0,
        };
        let result = writer.append_row("12", &entry).await;
        assert!(matches!(result, Err(SheetsError::WritesDisabled)));
    }
}
