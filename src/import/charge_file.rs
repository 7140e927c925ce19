//! Parsing of uploaded charge files.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use super::ImportError;
use crate::sheets::{normalize_code, parse_amount};

/// One data row of a charge file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeLine {
    /// MARK cell with a trailing `.0` removed. Not validated yet.
    pub code: String,
    pub price: f64,
}

impl ChargeLine {
    /// A usable mark is a plain number.
    #[must_use]
    pub fn has_valid_code(&self) -> bool {
        !self.code.is_empty() && self.code.chars().all(|c| c.is_ascii_digit())
    }
}

/// Reads the MARK and TOTAL PRICE columns of a charge file.
///
/// Excel workbooks (`.xlsx`, `.xls`) are recognized by their signature and
/// read from the first worksheet; anything else is parsed as CSV, with both
/// `,` and `;` separators accepted. Rows with an empty MARK are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a required column is
/// missing or no row carries a MARK.
pub fn parse_charge_file(content: &[u8]) -> Result<Vec<ChargeLine>, ImportError> {
    let table = if is_workbook(content) {
        read_workbook(content)?
    } else {
        read_csv(content)?
    };
    charge_lines(&table)
}

/// File names the import accepts.
#[must_use]
pub fn is_charge_file_name(file_name: &str) -> bool {
    let name = file_name.to_lowercase();
    CHARGE_FILE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

const CHARGE_FILE_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

/// ZIP container of `.xlsx`.
const XLSX_SIGNATURE: &[u8] = b"PK\x03\x04";

/// OLE compound document of legacy `.xls`.
const XLS_SIGNATURE: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

fn is_workbook(content: &[u8]) -> bool {
    content.starts_with(XLSX_SIGNATURE) || content.starts_with(XLS_SIGNATURE)
}

/// A cell as the reader delivered it. Workbooks keep numbers typed so a
/// price never goes through text parsing.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Number(value) => value.to_string(),
        }
    }

    fn amount(&self) -> f64 {
        match self {
            Self::Text(text) => parse_amount(text),
            Self::Number(value) => *value,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Float(value) => Self::Number(*value),
            #[allow(clippy::cast_precision_loss)]
            Data::Int(value) => Self::Number(*value as f64),
            Data::Empty => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

fn read_csv(content: &[u8]) -> Result<Vec<Vec<Cell>>, ImportError> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let mut table = Vec::new();
    for result in reader.records() {
        let record = result?;
        table.push(record.iter().map(|s| Cell::Text(s.to_owned())).collect());
    }
    Ok(table)
}

fn read_workbook(content: &[u8]) -> Result<Vec<Vec<Cell>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyWorkbook)??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

/// Locates the columns in the first row and collects every row below it.
fn charge_lines(table: &[Vec<Cell>]) -> Result<Vec<ChargeLine>, ImportError> {
    let (headers, rows) = table
        .split_first()
        .ok_or(ImportError::MissingMarkColumn)?;
    let headers: Vec<String> = headers.iter().map(Cell::text).collect();

    let mark_idx = headers
        .iter()
        .position(|h| is_mark_header(h))
        .ok_or(ImportError::MissingMarkColumn)?;
    let price_idx = headers
        .iter()
        .position(|h| is_price_header(h))
        .ok_or(ImportError::MissingPriceColumn)?;

    let mut lines = Vec::new();
    for row in rows {
        let code = normalize_code(&row.get(mark_idx).map(Cell::text).unwrap_or_default());
        if code.is_empty() {
            continue;
        }

        let price = row.get(price_idx).map_or(0.0, Cell::amount);
        lines.push(ChargeLine { code, price });
    }

    if lines.is_empty() {
        return Err(ImportError::NoCodes);
    }
    Ok(lines)
}

fn is_mark_header(header: &str) -> bool {
    header.trim().to_lowercase().starts_with("mark")
}

fn is_price_header(header: &str) -> bool {
    let header = header.to_lowercase();
    header.contains("total") && (header.contains("price") || header.contains("pirce"))
}

/// Semicolon when the header line has more of them than commas.
fn sniff_delimiter(content: &[u8]) -> u8 {
    let header = content.split(|&b| b == b'\n').next().unwrap_or_default();
    let count = |needle: u8| header.iter().filter(|&&b| b == needle).count();
    if count(b';') > count(b',') { b';' } else { b',' }
}
