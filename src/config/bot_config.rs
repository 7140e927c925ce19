//! Bot configuration file: sheet references, role lists and investors.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sheets::{PROFIT_COLUMNS, SheetSource};

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Sheet '{name}' is misconfigured: {reason}")]
    InvalidSheet { name: String, reason: String },

    #[error("write_document_id is empty")]
    MissingWriteDocument,

    #[error("Threshold '{name}' must be a finite non-negative number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Investor {user_id} maps invalid month {month} (must be 1..=12)")]
    InvalidMonth { user_id: i64, month: u32 },

    #[error("Investor {user_id} maps month {month} to column {column} (must be 1..={max})")]
    InvalidColumn {
        user_id: i64,
        month: u32,
        column: usize,
        max: usize,
    },

    #[error("Investor {user_id} is configured more than once")]
    DuplicateInvestor { user_id: i64 },

    #[error("Investor year range {first}..={last} is empty")]
    InvalidYears { first: i32, last: i32 },

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Telegram user ids with fixed roles. Anyone else is a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolesConfig {
    /// May act as manager or investor.
    #[serde(default)]
    pub super_users: Vec<i64>,

    #[serde(default)]
    pub managers: Vec<i64>,

    #[serde(default)]
    pub investors: Vec<i64>,
}

/// An investor's monthly profit worksheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvestorSheet {
    /// Telegram user id of the investor.
    pub user_id: i64,

    /// Display name used in logs.
    pub name: String,

    /// Worksheet holding the `A1:F8` profit table.
    pub sheet: SheetSource,

    /// Month number (1..=12) to zero-based column index.
    pub month_columns: BTreeMap<u32, usize>,
}

impl InvestorSheet {
    /// Column holding the given month, if the sheet covers it.
    #[must_use]
    pub fn column_for(&self, month: u32) -> Option<usize> {
        self.month_columns.get(&month).copied()
    }
}

/// Root of the bot configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Customer balances worksheet.
    pub balances: SheetSource,

    /// Container charges worksheet.
    pub containers: SheetSource,

    /// Document whose per-category worksheets receive bulk import rows.
    pub write_document_id: String,

    #[serde(default)]
    pub roles: RolesConfig,

    #[serde(default)]
    pub investors: Vec<InvestorSheet>,

    /// Containers at or below this amount are hidden.
    #[serde(default = "default_threshold")]
    pub container_threshold: f64,

    /// Minimum balance (or debt) shown in manager lists.
    #[serde(default = "default_threshold")]
    pub list_minimum: f64,

    /// First year offered in the investor year picker.
    #[serde(default = "default_first_year")]
    pub first_year: i32,

    /// Last year offered in the investor year picker.
    #[serde(default = "default_last_year")]
    pub last_year: i32,
}

fn default_threshold() -> f64 {
    5.0
}

fn default_first_year() -> i32 {
    2025
}

fn default_last_year() -> i32 {
    2030
}

impl BotConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_all().into_iter().next().map_or(Ok(()), Err)
    }

    /// Returns every validation problem instead of stopping at the first.
    #[must_use]
    pub fn validate_all(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (name, source) in [("balances", &self.balances), ("containers", &self.containers)] {
            check_sheet(name, source, &mut errors);
        }

        if self.write_document_id.trim().is_empty() {
            errors.push(ValidationError::MissingWriteDocument);
        }

        for (name, value) in [
            ("container_threshold", self.container_threshold),
            ("list_minimum", self.list_minimum),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::InvalidThreshold { name, value });
            }
        }

        if self.first_year > self.last_year {
            errors.push(ValidationError::InvalidYears {
                first: self.first_year,
                last: self.last_year,
            });
        }

        let mut seen = HashSet::new();
        for investor in &self.investors {
            if !seen.insert(investor.user_id) {
                errors.push(ValidationError::DuplicateInvestor {
                    user_id: investor.user_id,
                });
            }

            check_sheet(&investor.name, &investor.sheet, &mut errors);

            for (&month, &column) in &investor.month_columns {
                if !(1..=12).contains(&month) {
                    errors.push(ValidationError::InvalidMonth {
                        user_id: investor.user_id,
                        month,
                    });
                }
                // Column A holds the descriptions
                if column == 0 || column >= PROFIT_COLUMNS {
                    errors.push(ValidationError::InvalidColumn {
                        user_id: investor.user_id,
                        month,
                        column,
                        max: PROFIT_COLUMNS - 1,
                    });
                }
            }
        }

        errors
    }

    /// Profit sheet of an investor, if one is configured.
    #[must_use]
    pub fn investor(&self, user_id: i64) -> Option<&InvestorSheet> {
        self.investors.iter().find(|i| i.user_id == user_id)
    }

    /// Years offered by the investor year picker.
    #[must_use]
    pub fn investor_years(&self) -> Vec<i32> {
        (self.first_year..=self.last_year).collect()
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        let month_columns = (8..=12).zip(1..=5).collect();

        Self {
            balances: SheetSource::by_gid("BALANCES_DOCUMENT_ID", 0),
            containers: SheetSource::by_title("CONTAINERS_DOCUMENT_ID", "U"),
            write_document_id: "BALANCES_DOCUMENT_ID".to_owned(),
            roles: RolesConfig {
                super_users: vec![100_000_001],
                managers: vec![100_000_002],
                investors: vec![100_000_003],
            },
            investors: vec![InvestorSheet {
                user_id: 100_000_003,
                name: "Investor 1".to_owned(),
                sheet: SheetSource::by_title("INVESTOR_DOCUMENT_ID", "12"),
                month_columns,
            }],
            container_threshold: default_threshold(),
            list_minimum: default_threshold(),
            first_year: default_first_year(),
            last_year: default_last_year(),
        }
    }
}

fn check_sheet(name: &str, source: &SheetSource, errors: &mut Vec<ValidationError>) {
    if source.document_id.trim().is_empty() {
        errors.push(ValidationError::InvalidSheet {
            name: name.to_owned(),
            reason: "document_id is empty".to_owned(),
        });
    }
    if let Err(e) = source.sheet_ref() {
        errors.push(ValidationError::InvalidSheet {
            name: name.to_owned(),
            reason: e.to_string(),
        });
    }
}
