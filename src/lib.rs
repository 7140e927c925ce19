//! Balance Bot Library
//!
//! A Telegram bot that reports customer balances kept in a Google
//! spreadsheet and notifies customers when their balance changes.
//!
//! This crate provides the core functionality for:
//! - Parsing spreadsheet exports into typed balance and container records
//! - Matching customers by phone number or code
//! - Polling the spreadsheet and detecting changed amounts
//! - Handling customer, manager and investor interactions via Telegram
//! - Importing charge files into per-category worksheets

pub mod commands;
pub mod config;
pub mod import;
pub mod monitor;
pub mod report;
pub mod session;
pub mod sheets;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;
