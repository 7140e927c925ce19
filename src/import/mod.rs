//! Bulk import of charge files.
//!
//! A manager uploads an Excel workbook (or a CSV export of one) with a MARK
//! (customer code) column and a total price column. Every resolved code gets one row appended to the worksheet
//! named after the customer's list.

mod charge_file;
mod runner;

pub use charge_file::{ChargeLine, is_charge_file_name, parse_charge_file};
pub use runner::{CHARGE_DESCRIPTION, ImportSummary, run_import};

use thiserror::Error;

use crate::sheets::SheetsError;

/// Errors that abort an import before anything is written.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("MARK ustuni topilmadi")]
    MissingMarkColumn,

    #[error("TOTAL PRICE yoki TOTAL PIRCE ustuni topilmadi")]
    MissingPriceColumn,

    #[error("Unreadable CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unreadable Excel file: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("The workbook has no worksheets")]
    EmptyWorkbook,

    #[error("Kodlar topilmadi")]
    NoCodes,

    #[error("Balances sheet unavailable: {0}")]
    Sheets(#[from] SheetsError),
}
