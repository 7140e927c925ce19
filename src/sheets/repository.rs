//! Query surface over the configured worksheets.

use std::sync::Arc;

use tracing::debug;

use super::SheetsError;
use super::fetcher::{SheetSource, SnapshotFetcher};
use super::matcher::{find_by_code, find_by_phone};
use super::records::{
    BalanceRecord, ContainerRecord, ProfitEntry, parse_balance_rows, parse_container_rows,
    parse_profit_rows,
};

/// Cells of an investor worksheet holding the profit table.
pub const PROFIT_RANGE: &str = "A1:F8";

/// Reads balances, containers and investor sheets on demand.
///
/// Every call fetches a fresh snapshot; nothing is cached here.
#[derive(Clone)]
pub struct SheetsRepository {
    fetcher: Arc<dyn SnapshotFetcher>,

    /// Authenticated reader for investor sheets, which are not shared
    /// publicly.
    private_fetcher: Option<Arc<dyn SnapshotFetcher>>,

    balances: SheetSource,
    containers: SheetSource,
    container_threshold: f64,
}

impl std::fmt::Debug for SheetsRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsRepository")
            .field("balances", &self.balances)
            .field("containers", &self.containers)
            .field("container_threshold", &self.container_threshold)
            .field("private_reads", &self.private_fetcher.is_some())
            .finish_non_exhaustive()
    }
}

impl SheetsRepository {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        balances: SheetSource,
        containers: SheetSource,
        container_threshold: f64,
    ) -> Self {
        Self {
            fetcher,
            private_fetcher: None,
            balances,
            containers,
            container_threshold,
        }
    }

    /// Reads investor sheets with `fetcher` instead of the public export.
    #[must_use]
    pub fn with_private_fetcher(mut self, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        self.private_fetcher = Some(fetcher);
        self
    }

    /// Containers at or below this amount are hidden.
    #[must_use]
    pub fn container_threshold(&self) -> f64 {
        self.container_threshold
    }

    /// Raw rows of the balances sheet, header included.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn balance_rows(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        self.fetcher.fetch(&self.balances).await
    }

    /// All parsable balance records.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn balances(&self) -> Result<Vec<BalanceRecord>, SheetsError> {
        Ok(parse_balance_rows(&self.balance_rows().await?))
    }

    /// Containers above the visibility threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn containers(&self) -> Result<Vec<ContainerRecord>, SheetsError> {
        let rows = self.fetcher.fetch(&self.containers).await?;
        Ok(parse_container_rows(&rows, self.container_threshold))
    }

    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<BalanceRecord>, SheetsError> {
        Ok(find_by_phone(&self.balance_rows().await?, phone))
    }

    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<BalanceRecord>, SheetsError> {
        Ok(find_by_code(&self.balance_rows().await?, code))
    }

    /// Visible container charge for a customer code.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn find_container(
        &self,
        code: &str,
    ) -> Result<Option<ContainerRecord>, SheetsError> {
        let code = code.trim();
        Ok(self
            .containers()
            .await?
            .into_iter()
            .find(|record| record.code == code))
    }

    /// Customers with a positive balance of at least `min`, largest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn positive_balances(&self, min: f64) -> Result<Vec<BalanceRecord>, SheetsError> {
        let mut records: Vec<_> = self
            .balances()
            .await?
            .into_iter()
            .filter(|r| r.amount > 0.0 && r.amount >= min)
            .collect();
        records.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        Ok(records)
    }

    /// Customers owing at least `min`, largest debt first.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn debtors(&self, min: f64) -> Result<Vec<BalanceRecord>, SheetsError> {
        let mut records: Vec<_> = self
            .balances()
            .await?
            .into_iter()
            .filter(|r| r.amount < 0.0 && r.amount.abs() >= min)
            .collect();
        records.sort_by(|a, b| a.amount.total_cmp(&b.amount));
        Ok(records)
    }

    /// Profit lines of one month column of an investor worksheet.
    ///
    /// Reads [`PROFIT_RANGE`] unless the sheet names its own range.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn investor_profit(
        &self,
        sheet: &SheetSource,
        column: usize,
        period: &str,
    ) -> Result<Vec<ProfitEntry>, SheetsError> {
        let mut sheet = sheet.clone();
        if sheet.range.is_none() {
            sheet.range = Some(PROFIT_RANGE.to_owned());
        }

        let fetcher = self.private_fetcher.as_ref().unwrap_or(&self.fetcher);
        let rows = fetcher.fetch(&sheet).await?;
        let entries = parse_profit_rows(&rows, column, period);
        debug!("Parsed {} profit lines for {}", entries.len(), period);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::testing::{FakeFetcher, repository, rows};
    use crate::sheets::{Rows, SheetSource};

    use super::PROFIT_RANGE;

    fn balance_sheet() -> Rows {
        rows(&[
            &["Phone", "Name", "List", "Code", "Sum"],
            &["901111111", "Ali", "12", "1111", "120"],
            &["902222222", "Vali", "13", "2222", "-300", "50"],
            &["903333333", "Hasan", "12", "3333", "-2"],
            &["904444444", "Husan", "14", "4444", "2 000"],
        ])
    }

    #[tokio::test]
    async fn test_positive_balances_sorted() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.set("balances", balance_sheet());
        let repo = repository(fetcher);

        let positive = repo.positive_balances(5.0).await.unwrap();
        let names: Vec<_> = positive.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Husan", "Ali"]);
    }

    #[tokio::test]
    async fn test_debtors_filtered_by_minimum() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.set("balances", balance_sheet());
        let repo = repository(fetcher);

        let debtors = repo.debtors(5.0).await.unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].name, "Vali");
        assert!((debtors[0].amount + 300.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_find_container_hides_small_amounts() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.set(
            "containers",
            rows(&[
                &["#", "Name", "x", "Code", "Sum"],
                &["1", "Ali", "x", "1111", "4"],
                &["2", "Vali", "x", "2222", "75", "25"],
            ]),
        );
        let repo = repository(fetcher);

        assert!(repo.find_container("1111").await.unwrap().is_none());
        let found = repo.find_container(" 2222 ").await.unwrap().unwrap();
        assert!((found.amount - 75.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let repo = repository(Arc::new(FakeFetcher::default()));
        assert!(repo.find_by_phone("901111111").await.is_err());
    }

    fn profit_sheet() -> Rows {
        rows(&[
            &["", "Avgust", "Sentyabr"],
            &["Rent", "10", "1 000"],
            &["Fuel", "5", ""],
        ])
    }

    #[tokio::test]
    async fn test_investor_profit_reads_table_range() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.set("investor", profit_sheet());
        let repo = repository(Arc::clone(&fetcher));

        let sheet = SheetSource::by_title("investor", "12");
        let entries = repo.investor_profit(&sheet, 2, "2025.09").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].amount - 1000.0).abs() < 1e-9);
        assert_eq!(
            fetcher.requests()[0].range.as_deref(),
            Some(PROFIT_RANGE)
        );
    }

    #[tokio::test]
    async fn test_investor_profit_uses_private_fetcher() {
        let public = Arc::new(FakeFetcher::default());
        public.set("balances", balance_sheet());
        let private = Arc::new(FakeFetcher::default());
        private.set("investor", profit_sheet());

        let repo = repository(Arc::clone(&public)).with_private_fetcher(Arc::clone(&private) as Arc<dyn crate::sheets::SnapshotFetcher>);
        let sheet = SheetSource::by_title("investor", "12");

        let entries = repo.investor_profit(&sheet, 1, "2025.08").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(private.requests().len(), 1);
        assert!(public.requests().is_empty());

        // Balances still come from the public export
        assert!(!repo.balances().await.unwrap().is_empty());
        assert_eq!(public.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_private_fetch_failure_propagates() {
        let public = Arc::new(FakeFetcher::default());
        public.set("investor", profit_sheet());
        let repo = repository(public).with_private_fetcher(Arc::new(FakeFetcher::default()));

        let sheet = SheetSource::by_title("investor", "12");
        assert!(repo.investor_profit(&sheet, 1, "2025.08").await.is_err());
    }
}
