//! In-memory fakes of the sheet and transport seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::commands::Reply;
use crate::sheets::{
    ChargeEntry, Rows, SheetSource, SheetWriter, SheetsError, SheetsRepository, SnapshotFetcher,
};
use crate::telegram::{Messenger, TelegramError};

/// Serves rows per document id; unknown documents fail like an outage.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    sheets: Mutex<HashMap<String, Rows>>,
    requests: Mutex<Vec<SheetSource>>,
}

impl FakeFetcher {
    pub fn set(&self, document_id: &str, rows: Rows) {
        self.sheets
            .lock()
            .unwrap()
            .insert(document_id.to_owned(), rows);
    }

    pub fn clear(&self, document_id: &str) {
        self.sheets.lock().unwrap().remove(document_id);
    }

    pub fn requests(&self) -> Vec<SheetSource> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotFetcher for FakeFetcher {
    async fn fetch(&self, source: &SheetSource) -> Result<Rows, SheetsError> {
        self.requests.lock().unwrap().push(source.clone());
        self.sheets
            .lock()
            .unwrap()
            .get(&source.document_id)
            .cloned()
            .ok_or_else(|| SheetsError::Status {
                status: 503,
                url: source.document_id.clone(),
            })
    }
}

/// Records appended rows; worksheets marked as failing reject writes.
#[derive(Debug, Default)]
pub struct FakeWriter {
    appended: Mutex<Vec<(String, ChargeEntry)>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeWriter {
    pub fn fail_on(&self, worksheet: &str) {
        self.failing.lock().unwrap().insert(worksheet.to_owned());
    }

    pub fn appended(&self) -> Vec<(String, ChargeEntry)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetWriter for FakeWriter {
    async fn append_row(&self, worksheet: &str, entry: &ChargeEntry) -> Result<(), SheetsError> {
        if self.failing.lock().unwrap().contains(worksheet) {
            return Err(SheetsError::AppendRejected {
                worksheet: worksheet.to_owned(),
                status: 400,
                body: "Unable to parse range".to_owned(),
            });
        }
        self.appended
            .lock()
            .unwrap()
            .push((worksheet.to_owned(), entry.clone()));
        Ok(())
    }
}

/// Records every sent message.
#[derive(Debug, Default)]
pub struct FakeMessenger {
    sent: Mutex<Vec<(i64, Reply)>>,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<(i64, Reply)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push((chat_id, reply.clone()));
        Ok(())
    }
}

pub fn rows(cells: &[&[&str]]) -> Rows {
    cells
        .iter()
        .map(|row| row.iter().map(|c| (*c).to_owned()).collect())
        .collect()
}

/// Repository over the `balances` and `containers` fake documents with a
/// container threshold of 5.
pub fn repository(fetcher: Arc<FakeFetcher>) -> SheetsRepository {
    SheetsRepository::new(
        fetcher,
        SheetSource::by_gid("balances", 0),
        SheetSource::by_gid("containers", 1),
        5.0,
    )
}
