//! Telegram Bot API wrapper module.
//!
//! Provides the outbound client with rate limiting, keyboard mapping and
//! the long polling dispatcher.

mod client;
mod dispatcher;
mod keyboards;
mod rate_limiter;

pub use client::{Messenger, TelegramBot, TelegramError, mask_phone};
pub use dispatcher::run_dispatcher;
pub use keyboards::{inline_markup, reply_markup};
pub use rate_limiter::RateLimiter;
