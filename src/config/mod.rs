//! Configuration module for the balance bot.
//!
//! Environment settings (credentials, timings) and the JSON bot
//! configuration (sheets, roles, investors).

mod bot_config;
mod settings;

pub use bot_config::{BotConfig, InvestorSheet, RolesConfig, ValidationError};
pub use settings::{BotSettings, ConfigError, TelegramConfig};
