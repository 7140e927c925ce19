//! Writing parsed charge lines to the customers' worksheets.

use tracing::{debug, info, warn};

use super::{ChargeLine, ImportError};
use crate::sheets::{ChargeEntry, SheetWriter, SheetsRepository, find_by_code};

/// Description written with every imported charge.
pub const CHARGE_DESCRIPTION: &str = "Yuk keldi";

/// Counters reported back to the uploader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    /// Lines with a MARK.
    pub codes_count: usize,
    /// Codes that resolved to a customer.
    pub found: usize,
    /// Codes that are invalid or unknown.
    pub not_found: usize,
    /// Rows actually appended.
    pub updated: usize,
    /// Sum of all prices in the file.
    pub total_amount: f64,
}

/// Appends one charge per resolved code to the worksheet named after the
/// customer's list.
///
/// A failed write is logged and left out of `updated`; the remaining lines
/// are still processed.
///
/// # Errors
///
/// Returns an error only if the balances sheet cannot be read, in which
/// case nothing has been written.
pub async fn run_import(
    repo: &SheetsRepository,
    writer: &dyn SheetWriter,
    lines: &[ChargeLine],
    file_name: &str,
    today: &str,
) -> Result<ImportSummary, ImportError> {
    let rows = repo.balance_rows().await?;
    info!("Importing {} charge lines from {}", lines.len(), file_name);

    let mut summary = ImportSummary {
        codes_count: lines.len(),
        total_amount: lines.iter().map(|l| l.price).sum(),
        ..ImportSummary::default()
    };

    for line in lines {
        let record = if line.has_valid_code() {
            find_by_code(&rows, &line.code)
        } else {
            None
        };
        let Some(record) = record else {
            debug!("Code {} not found", line.code);
            summary.not_found += 1;
            continue;
        };
        summary.found += 1;

        let entry = ChargeEntry {
            date: today.to_owned(),
            source: file_name.to_owned(),
            description: CHARGE_DESCRIPTION.to_owned(),
            amount: line.price,
        };
        match writer.append_row(record.list_name.trim(), &entry).await {
            Ok(()) => {
                summary.updated += 1;
                debug!("Code {} written to list {}", line.code, record.list_name);
            }
            Err(e) => warn!(
                "Failed to write code {} to list {}: {}",
                line.code, record.list_name, e
            ),
        }
    }

    info!(
        "Import of {} done: {} found, {} written, {} not found",
        file_name, summary.found, summary.updated, summary.not_found
    );
    Ok(summary)
}
