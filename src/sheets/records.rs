//! Typed rows of the balance, container and investor worksheets.
//!
//! Every sheet row is validated here once; the rest of the crate only sees
//! these records.

use serde::{Deserialize, Serialize};

use super::amount::{join_split_amount, parse_amount};
use super::matcher::normalize_phone;

/// Minimum cells a balance row needs: phone, name, list, code, amount.
pub const BALANCE_MIN_CELLS: usize = 5;

/// Minimum cells a container row needs: -, name, -, code, amount.
pub const CONTAINER_MIN_CELLS: usize = 5;

/// Shortest normalized phone that can serve as a snapshot key.
pub const MIN_KEY_DIGITS: usize = 9;

/// Raw CSV snapshot: rows of trimmed cells, header first.
pub type Rows = Vec<Vec<String>>;

/// A customer row of the balances worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Phone number as written in the sheet.
    pub phone: String,
    /// Customer display name.
    pub name: String,
    /// Worksheet (category) that charges for this customer go to.
    pub list_name: String,
    /// Verification code, doubles as the customer mark on cargo.
    pub code: String,
    /// Current balance in dollars.
    pub amount: f64,
}

impl BalanceRecord {
    /// Parses a data row. Columns: A phone, B name, C list, D code,
    /// E amount, F optional fractional part of E.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < BALANCE_MIN_CELLS {
            return None;
        }

        let raw_amount = join_split_amount(&row[4], row.get(5).map(String::as_str));

        Some(Self {
            phone: row[0].trim().to_owned(),
            name: row[1].trim().to_owned(),
            list_name: row[2].trim().to_owned(),
            code: row[3].trim().to_owned(),
            amount: parse_amount(&raw_amount),
        })
    }

    /// Digits-only phone used as the snapshot identity key.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_phone(&self.phone)
    }

    /// Whether the phone is long enough to correlate across polls.
    #[must_use]
    pub fn has_key(&self) -> bool {
        self.key().len() >= MIN_KEY_DIGITS
    }
}

/// A row of the container charges worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub code: String,
    pub name: String,
    pub amount: f64,
}

impl ContainerRecord {
    /// Parses a data row. Columns: B name, D code, E amount, F optional
    /// fractional part. Rows without a code are dropped.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < CONTAINER_MIN_CELLS {
            return None;
        }

        let code = row[3].trim();
        if code.is_empty() {
            return None;
        }

        let name = match row[1].trim() {
            "" => "N/A",
            name => name,
        };

        let whole = match row[4].trim() {
            "" => "0",
            whole => whole,
        };
        let raw_amount = join_split_amount(whole, row.get(5).map(String::as_str));

        Some(Self {
            code: code.to_owned(),
            name: name.to_owned(),
            amount: parse_amount(&raw_amount),
        })
    }
}

/// One line of an investor's monthly profit sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitEntry {
    /// `YYYY.MM` of the requested month.
    pub period: String,
    pub description: String,
    pub amount: f64,
}

/// Parses every data row of the balances sheet, header skipped.
#[must_use]
pub fn parse_balance_rows(rows: &[Vec<String>]) -> Vec<BalanceRecord> {
    rows.iter()
        .skip(1)
        .filter_map(|row| BalanceRecord::from_row(row))
        .collect()
}

/// Parses the container sheet, keeping rows above `threshold`.
#[must_use]
pub fn parse_container_rows(rows: &[Vec<String>], threshold: f64) -> Vec<ContainerRecord> {
    rows.iter()
        .skip(1)
        .filter_map(|row| ContainerRecord::from_row(row))
        .filter(|record| record.amount > threshold)
        .collect()
}

/// Rows of the `A1:F8` investor window, header included.
pub const PROFIT_WINDOW_ROWS: usize = 8;

/// Columns of the `A1:F8` investor window.
pub const PROFIT_COLUMNS: usize = 6;

/// Parses the `A1:F8` window of an investor sheet for one month column.
///
/// Column A holds the description; rows without one are skipped. A blank
/// amount cell counts as zero.
#[must_use]
pub fn parse_profit_rows(rows: &[Vec<String>], column: usize, period: &str) -> Vec<ProfitEntry> {
    rows.iter()
        .take(PROFIT_WINDOW_ROWS)
        .skip(1)
        .filter_map(|row| {
            let description = row.first()?.trim();
            if description.is_empty() {
                return None;
            }

            let amount = row.get(column).map_or(0.0, |cell| parse_amount(cell));

            Some(ProfitEntry {
                period: period.to_owned(),
                description: description.to_owned(),
                amount,
            })
        })
        .collect()
}

/// Reduces a spreadsheet code such as `"1111.0"` to `"1111"`.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    code.strip_suffix(".0").unwrap_or(code).to_owned()
}

/// Integer form of a code exported as float text (`"0012.0"` -> `"12"`).
#[must_use]
pub fn integer_form(code: &str) -> Option<String> {
    let code = code.trim();
    let only_digits_and_points = code.chars().all(|c| c.is_ascii_digit() || c == '.');
    if code.is_empty() || !only_digits_and_points || code.parse::<f64>().is_err() {
        return None;
    }

    let whole = code.split('.').next().unwrap_or_default();
    let whole = whole.trim_start_matches('0');
    Some(if whole.is_empty() { "0".to_owned() } else { whole.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn test_balance_from_row_joins_fraction() {
        let record =
            BalanceRecord::from_row(&row(&["+998 90 123-45-67", "Ali", "12", "1111", "-1 234", "5"]))
                .unwrap();
        assert_eq!(record.key(), "998901234567");
        assert_eq!(record.list_name, "12");
        assert!((record.amount + 1234.5).abs() < 1e-9);
    }

    #[test]
    fn test_balance_from_row_too_short() {
        assert!(BalanceRecord::from_row(&row(&["901234567", "Ali", "12", "1111"])).is_none());
    }

    #[test]
    fn test_short_phone_has_no_key() {
        let record = BalanceRecord::from_row(&row(&["12345", "Ali", "12", "1", "0"])).unwrap();
        assert!(!record.has_key());
    }

    #[test]
    fn test_container_rows_threshold_and_defaults() {
        let rows = vec![
            row(&["#", "Name", "x", "Code", "Sum"]),
            row(&["1", "", "x", "2001", "7"]),
            row(&["2", "Vali", "x", "2002", "5"]),
            row(&["3", "Hasan", "x", "", "100"]),
            row(&["4", "Husan", "x", "2004", "", "50"]),
        ];

        let parsed = parse_container_rows(&rows, 5.0);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "N/A");
        assert_eq!(parsed[0].code, "2001");
    }

    #[test]
    fn test_profit_rows_window() {
        let mut rows = vec![row(&["", "08", "09"])];
        rows.push(row(&["Rent", "1 000,50", "-"]));
        rows.push(row(&["", "5", "5"]));
        rows.push(row(&["Fuel", "200"]));
        for i in 0..10 {
            rows.push(row(&[&format!("Extra {i}"), "1", "1"]));
        }

        let entries = parse_profit_rows(&rows, 2, "2025.09");
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].description, "Rent");
        assert!(entries[0].amount.abs() < 1e-9);
        assert!(entries[1].amount.abs() < 1e-9);
        assert_eq!(entries[0].period, "2025.09");
    }

    #[test]
    fn test_code_forms() {
        assert_eq!(normalize_code(" 1111.0 "), "1111");
        assert_eq!(normalize_code("A-17"), "A-17");
        assert_eq!(integer_form("1111.0").as_deref(), Some("1111"));
        assert_eq!(integer_form("0012"), Some("12".to_owned()));
        assert_eq!(integer_form("1.2.3"), None);
        assert_eq!(integer_form("A1"), None);
    }
}
