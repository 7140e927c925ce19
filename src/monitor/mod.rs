//! Spreadsheet polling and change notifications.
//!
//! Compares each fetched snapshot against the previous one and notifies
//! the authenticated owner of every changed amount.

mod backoff;
mod runner;
mod state;

pub use backoff::Backoff;
pub use runner::{BalanceMonitor, MonitorError, MonitorMessage, PollReport};
pub use state::{ChangeEvent, ChangeKind, Direction, SnapshotState, to_cents};
