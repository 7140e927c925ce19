//! Telegram Bot API client wrapper.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use teloxide::{DownloadError, RequestError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::RateLimiter;
use super::keyboards::{inline_markup, reply_markup};
use crate::commands::Reply;
use crate::config::TelegramConfig;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("API request error: {0}")]
    Request(RequestError),

    #[error("File download failed: {0}")]
    Download(#[from] DownloadError),
}

impl From<RequestError> for TelegramError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RetryAfter(seconds) => Self::FloodWait(seconds.seconds()),
            other => Self::Request(other),
        }
    }
}

/// Outbound side used by the notifier.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends `reply` as a new message to a private chat.
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError>;
}

/// High-level Telegram client wrapper.
#[derive(Clone)]
pub struct TelegramBot {
    /// The underlying teloxide bot.
    bot: Bot,

    /// Paces every outbound call.
    rate_limiter: Arc<RateLimiter>,
}

impl TelegramBot {
    /// Creates a client for the configured bot token.
    #[must_use]
    pub fn new(config: &TelegramConfig, send_interval: Duration) -> Self {
        Self {
            bot: Bot::new(config.bot_token.clone()),
            rate_limiter: Arc::new(RateLimiter::new(send_interval)),
        }
    }

    /// Returns the underlying bot for dispatching updates.
    #[must_use]
    pub fn inner(&self) -> &Bot {
        &self.bot
    }

    /// Verifies the token and drops any webhook so long polling receives
    /// updates. Returns the bot username.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the API is unreachable.
    pub async fn connect(&self) -> Result<String, TelegramError> {
        let me = self.bot.get_me().await?;
        self.bot.delete_webhook().await?;
        let username = me.username().to_owned();
        info!("Connected to Telegram as @{}", username);
        Ok(username)
    }

    /// Replaces the text and inline keyboard of an earlier message.
    ///
    /// A reply keyboard cannot be attached to an edit; it is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn edit(
        &self,
        chat_id: i64,
        message_id: MessageId,
        reply: &Reply,
    ) -> Result<(), TelegramError> {
        self.rate_limiter.wait_and_acquire().await;
        debug!("Editing message in {}: \"{}\"", chat_id, truncate_for_log(&reply.text, 30));

        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), message_id, &reply.text);
        if reply.markdown {
            request = request.parse_mode(ParseMode::Markdown);
        }
        if let Some(markup) = reply.keyboard.as_ref().and_then(inline_markup) {
            request = request.reply_markup(markup);
        }

        match request.await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    /// Acknowledges a pressed inline button so the client stops its spinner.
    pub async fn answer_callback(&self, callback_id: String) {
        if let Err(e) = self.bot.answer_callback_query(callback_id).await {
            debug!("Failed to answer callback query: {}", e);
        }
    }

    /// Downloads an uploaded document into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata or its content cannot be read.
    pub async fn download(&self, file_id: String) -> Result<Vec<u8>, TelegramError> {
        let file = self.bot.get_file(file_id).await?;
        let mut content = Vec::new();
        self.bot.download_file(&file.path, &mut content).await?;
        debug!("Downloaded {} bytes", content.len());
        Ok(content)
    }

    async fn on_error(&self, err: RequestError) -> TelegramError {
        let err = TelegramError::from(err);
        if let TelegramError::FloodWait(seconds) = &err {
            self.rate_limiter
                .handle_retry_after(Duration::from_secs(u64::from(*seconds)))
                .await;
        }
        err
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), TelegramError> {
        self.rate_limiter.wait_and_acquire().await;
        debug!("Sending to {}: \"{}\"", chat_id, truncate_for_log(&reply.text, 30));

        let mut request = self.bot.send_message(ChatId(chat_id), &reply.text);
        if reply.markdown {
            request = request.parse_mode(ParseMode::Markdown);
        }
        if let Some(keyboard) = &reply.keyboard {
            request = request.reply_markup(reply_markup(keyboard));
        }

        match request.await {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = self.on_error(e).await;
                warn!("Failed to send message to {}: {}", chat_id, err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

/// Truncates a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_len {
        first_line.to_owned()
    } else {
        format!("{}...", first_line.chars().take(max_len).collect::<String>())
    }
}
