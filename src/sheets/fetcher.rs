//! Worksheet snapshot fetching over HTTP.
//!
//! Public worksheets are read through the CSV export. Private ones go
//! through the Sheets API `values` endpoint with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SheetsError;
use super::records::Rows;
use super::writer::{quote_title, values_url};

/// Base URL of Google Sheets documents.
const DOCS_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

/// How a worksheet inside a document is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    /// Numeric worksheet id from the `gid=` URL parameter.
    Gid(u64),
    /// Worksheet tab title.
    Title(String),
}

/// A worksheet inside a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSource {
    /// Spreadsheet document id (the long token in the document URL).
    pub document_id: String,

    /// Numeric worksheet id. Mutually exclusive with `title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u64>,

    /// Worksheet title. Mutually exclusive with `gid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// A1 range to read instead of the whole worksheet, e.g. `A1:F8`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl SheetSource {
    /// Creates a source addressed by numeric worksheet id.
    #[must_use]
    pub fn by_gid(document_id: impl Into<String>, gid: u64) -> Self {
        Self {
            document_id: document_id.into(),
            gid: Some(gid),
            title: None,
            range: None,
        }
    }

    /// Creates a source addressed by worksheet title.
    #[must_use]
    pub fn by_title(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            gid: None,
            title: Some(title.into()),
            range: None,
        }
    }

    /// Restricts reads to an A1 range.
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Resolves the worksheet reference.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one of `gid` and `title` is set.
    pub fn sheet_ref(&self) -> Result<SheetRef, SheetsError> {
        match (self.gid, self.title.as_deref().map(str::trim)) {
            (Some(gid), None) => Ok(SheetRef::Gid(gid)),
            (None, Some(title)) if !title.is_empty() => Ok(SheetRef::Title(title.to_owned())),
            _ => Err(SheetsError::InvalidReference(format!(
                "document {} needs exactly one of gid or title",
                self.document_id
            ))),
        }
    }
}

/// Source of raw worksheet snapshots.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetches every non-blank row of the worksheet, header included.
    async fn fetch(&self, source: &SheetSource) -> Result<Rows, SheetsError>;
}

/// Fetches worksheets through the public CSV export.
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
}

impl HttpSnapshotFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, SheetsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn request(&self, source: &SheetSource) -> Result<reqwest::RequestBuilder, SheetsError> {
        let (endpoint, mut query) = match source.sheet_ref()? {
            SheetRef::Gid(gid) => (
                "export",
                vec![("format", "csv".to_owned()), ("gid", gid.to_string())],
            ),
            // Without headers=0 gviz folds leading rows into the header
            SheetRef::Title(title) => (
                "gviz/tq",
                vec![
                    ("tqx", "out:csv".to_owned()),
                    ("sheet", title),
                    ("headers", "0".to_owned()),
                ],
            ),
        };
        if let Some(range) = &source.range {
            query.push(("range", range.clone()));
        }

        Ok(self
            .client
            .get(format!("{DOCS_BASE_URL}/{}/{endpoint}", source.document_id))
            .query(&query))
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self, source: &SheetSource) -> Result<Rows, SheetsError> {
        let response = self.request(source)?.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(SheetsError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;
        ensure_csv(&url, content_type.as_deref(), &body)?;
        let rows = parse_csv(&body)?;
        debug!(
            "Fetched {} rows from document {}",
            rows.len(),
            source.document_id
        );
        Ok(rows)
    }
}

/// Reads private worksheets through the Sheets API `values` endpoint.
///
/// Worksheets must be addressed by title. A source without a range reads
/// the whole worksheet.
pub struct SheetsApiFetcher {
    client: reqwest::Client,
    access_token: String,
}

impl std::fmt::Debug for SheetsApiFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsApiFetcher").finish_non_exhaustive()
    }
}

impl SheetsApiFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, SheetsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
        })
    }

    fn request(&self, source: &SheetSource) -> Result<reqwest::RequestBuilder, SheetsError> {
        let SheetRef::Title(title) = source.sheet_ref()? else {
            return Err(SheetsError::InvalidReference(format!(
                "document {} must name the worksheet by title for API reads",
                source.document_id
            )));
        };

        let range = match &source.range {
            Some(range) => format!("{}!{range}", quote_title(&title)),
            None => quote_title(&title),
        };
        let url = values_url(&source.document_id, &range, "")?;
        Ok(self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("majorDimension", "ROWS")]))
    }
}

#[async_trait]
impl SnapshotFetcher for SheetsApiFetcher {
    async fn fetch(&self, source: &SheetSource) -> Result<Rows, SheetsError> {
        let response = self.request(source)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SheetsError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let rows = parse_values(&response.text().await?)?;
        debug!(
            "Read {} rows of document {} through the API",
            rows.len(),
            source.document_id
        );
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct ValueRange {
    /// Absent when the range is empty.
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Parses a `values.get` response body into trimmed rows, dropping blank
/// ones like [`parse_csv`] does.
///
/// # Errors
///
/// Returns an error if the body is not a value range.
pub fn parse_values(body: &str) -> Result<Rows, SheetsError> {
    let range: ValueRange = serde_json::from_str(body)?;
    Ok(range
        .values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(text) => text.trim().to_owned(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect())
}

/// Rejects a body that is not a CSV export, such as the HTML sign-in page
/// served for a private document.
///
/// # Errors
///
/// Returns [`SheetsError::NotCsv`] when the content type is present and not
/// `text/csv`, or the body starts with markup.
pub fn ensure_csv(url: &str, content_type: Option<&str>, body: &str) -> Result<(), SheetsError> {
    let csv_type = content_type.is_none_or(|ct| {
        ct.split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/csv"))
    });
    let markup = body.trim_start_matches('\u{feff}').trim_start().starts_with('<');

    if csv_type && !markup {
        return Ok(());
    }
    Err(SheetsError::NotCsv {
        url: url.to_owned(),
        content_type: content_type.unwrap_or("unknown").to_owned(),
    })
}

/// Parses CSV text into trimmed rows, dropping blank lines.
///
/// # Errors
///
/// Returns an error on malformed CSV (e.g. invalid UTF-8).
pub fn parse_csv(text: &str) -> Result<Rows, SheetsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(|cell| cell.trim().to_owned()).collect();
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_quoted_decimal_comma() {
        let text = "Phone,Name,List,Code,Sum\n\
                    901234567,\"Ali Valiyev\",12,1111,\"1 234,56\"\n\
                    \n\
                    ,,,,\n\
                    902222222,Vali,13,2222,-50\n";

        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "Ali Valiyev");
        assert_eq!(rows[1][4], "1 234,56");
        assert_eq!(rows[2][4], "-50");
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let rows = parse_csv("a,b\nc\nd,e,f\n").unwrap();
        assert_eq!(rows[1], vec!["c".to_owned()]);
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn test_sheet_ref_resolution() {
        assert_eq!(
            SheetSource::by_gid("doc", 42).sheet_ref().unwrap(),
            SheetRef::Gid(42)
        );
        assert_eq!(
            SheetSource::by_title("doc", "U").sheet_ref().unwrap(),
            SheetRef::Title("U".to_owned())
        );

        let both = SheetSource {
            document_id: "doc".to_owned(),
            gid: Some(1),
            title: Some("U".to_owned()),
            range: None,
        };
        assert!(both.sheet_ref().is_err());
        assert!(SheetSource::by_title("doc", "  ").sheet_ref().is_err());
    }

    fn query(request: &reqwest::Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn test_title_export_reads_raw_range() {
        let fetcher = HttpSnapshotFetcher::new(Duration::from_secs(1)).unwrap();
        let source = SheetSource::by_title("doc", "12").with_range("A1:F8");
        let request = fetcher.request(&source).unwrap().build().unwrap();

        assert_eq!(request.url().path(), "/spreadsheets/d/doc/gviz/tq");
        let query = query(&request);
        assert!(query.contains(&pair("sheet", "12")));
        assert!(query.contains(&pair("headers", "0")));
        assert!(query.contains(&pair("range", "A1:F8")));
    }

    #[test]
    fn test_gid_export_request() {
        let fetcher = HttpSnapshotFetcher::new(Duration::from_secs(1)).unwrap();
        let request = fetcher
            .request(&SheetSource::by_gid("doc", 7))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().path(), "/spreadsheets/d/doc/export");
        assert_eq!(query(&request), vec![pair("format", "csv"), pair("gid", "7")]);
    }

    #[test]
    fn test_sign_in_page_is_not_csv() {
        let page = "<!DOCTYPE html><html><head><title>Sign in</title></head>\n<body>x</body></html>";

        // parse_csv alone would accept the page as two rows
        assert_eq!(parse_csv(page).unwrap().len(), 2);

        assert!(matches!(
            ensure_csv("u", Some("text/html; charset=utf-8"), page),
            Err(SheetsError::NotCsv { .. })
        ));
        assert!(matches!(
            ensure_csv("u", Some("text/csv"), page),
            Err(SheetsError::NotCsv { .. })
        ));
        assert!(matches!(
            ensure_csv("u", None, "\u{feff}  <html>"),
            Err(SheetsError::NotCsv { .. })
        ));
        assert!(matches!(
            ensure_csv("u", Some("application/json"), "a,b\n"),
            Err(SheetsError::NotCsv { .. })
        ));
    }

    #[test]
    fn test_csv_export_is_accepted() {
        assert!(ensure_csv("u", Some("text/csv; charset=utf-8"), "a,b\n1,2\n").is_ok());
        assert!(ensure_csv("u", Some("TEXT/CSV"), "").is_ok());
        assert!(ensure_csv("u", None, "Phone,Name\n").is_ok());
    }

    #[test]
    fn test_api_request_uses_token_and_range() {
        let fetcher = SheetsApiFetcher::new("secret", Duration::from_secs(1)).unwrap();
        let source = SheetSource::by_title("inv", "12").with_range("A1:F8");
        let request = fetcher.request(&source).unwrap().build().unwrap();

        assert_eq!(request.url().path(), "/v4/spreadsheets/inv/values/'12'!A1:F8");
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn test_api_request_needs_title() {
        let fetcher = SheetsApiFetcher::new("secret", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            fetcher.request(&SheetSource::by_gid("inv", 0)),
            Err(SheetsError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_parse_values() {
        let body = r#"{
            "range": "'12'!A1:F8",
            "majorDimension": "ROWS",
            "values": [
                ["", "Avgust", "Sentyabr"],
                [" Rent ", "10", "1 000"],
                [],
                ["Fuel", 5, null]
            ]
        }"#;

        let rows = parse_values(body).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "Rent");
        assert_eq!(rows[2], vec!["Fuel".to_owned(), "5".to_owned(), String::new()]);
    }

    #[test]
    fn test_parse_empty_value_range() {
        let rows = parse_values(r#"{"range": "'12'!A1:F8", "majorDimension": "ROWS"}"#).unwrap();
        assert!(rows.is_empty());
        assert!(matches!(parse_values("<html>"), Err(SheetsError::Json(_))));
    }
}
