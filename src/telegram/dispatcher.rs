//! Long polling update dispatch.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Document, Message, MessageId, User};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info, warn};

use super::client::{Messenger, TelegramBot, TelegramError};
use crate::commands::{CommandHandler, Reply};
use crate::report::messages;

/// Receives updates until Ctrl-C and routes them to the command handler.
pub async fn run_dispatcher(telegram: TelegramBot, handler: Arc<CommandHandler>) {
    let schema = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("Bot is running! Send /start to begin.");

    Dispatcher::builder(telegram.inner().clone(), schema)
        .dependencies(dptree::deps![telegram, handler])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_message(
    telegram: TelegramBot,
    handler: Arc<CommandHandler>,
    msg: Message,
) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(user_id) = user_id(user) else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    let replies = if let Some(contact) = msg.contact() {
        let owner = contact.user_id.and_then(|id| i64::try_from(id.0).ok());
        handler
            .handle_contact(user_id, owner, &contact.phone_number)
            .await
    } else if let Some(document) = msg.document() {
        on_document(&telegram, &handler, user_id, document).await
    } else if let Some(text) = msg.text() {
        if is_start(text) {
            handler.handle_start(user_id, &user.first_name).await
        } else {
            handler.handle_text(user_id, text).await
        }
    } else {
        debug!("Ignoring unsupported message from {}", user_id);
        Vec::new()
    };

    deliver(&telegram, chat_id, None, &replies).await;
    Ok(())
}

async fn on_document(
    telegram: &TelegramBot,
    handler: &CommandHandler,
    user_id: i64,
    document: &Document,
) -> Vec<Reply> {
    let file_name = document.file_name.clone().unwrap_or_default();
    if let Some(rejection) = handler.check_upload(user_id, &file_name).await {
        return vec![rejection];
    }

    match telegram.download(document.file.id.clone()).await {
        Ok(content) => handler.handle_document(user_id, &file_name, &content).await,
        Err(e) => {
            warn!("Failed to download {}: {}", file_name, e);
            vec![Reply::text(messages::import_failed(&e.to_string()))]
        }
    }
}

async fn on_callback(
    telegram: TelegramBot,
    handler: Arc<CommandHandler>,
    q: CallbackQuery,
) -> ResponseResult<()> {
    telegram.answer_callback(q.id.clone()).await;

    let (Some(user_id), Some(data), Some(message)) =
        (user_id(&q.from), q.data.as_deref(), q.message.as_ref())
    else {
        return Ok(());
    };

    let replies = handler.handle_callback(user_id, data).await;
    deliver(&telegram, message.chat().id.0, Some(message.id()), &replies).await;
    Ok(())
}

/// Sends replies in order. Edits target `origin` and fall back to a new
/// message when there is none or the edit fails.
async fn deliver(
    telegram: &TelegramBot,
    chat_id: i64,
    origin: Option<MessageId>,
    replies: &[Reply],
) {
    for reply in replies {
        if let (true, Some(message_id)) = (reply.edit, origin) {
            match telegram.edit(chat_id, message_id, reply).await {
                Ok(())
                | Err(TelegramError::Request(RequestError::Api(ApiError::MessageNotModified))) => {
                    continue;
                }
                Err(e) => debug!("Edit in {} failed, sending instead: {}", chat_id, e),
            }
        }
        if let Err(e) = telegram.send(chat_id, reply).await {
            warn!("Reply to {} not delivered: {}", chat_id, e);
        }
    }
}

fn user_id(user: &User) -> Option<i64> {
    i64::try_from(user.id.0).ok()
}

/// `/start`, optionally with a deep link payload or a bot mention.
fn is_start(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|command| command.split('@').next())
        == Some("/start")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_start() {
        assert!(is_start("/start"));
        assert!(is_start("/start ref42"));
        assert!(is_start("/start@balance_bot"));
        assert!(!is_start("/started"));
        assert!(!is_start("start"));
        assert!(!is_start(""));
    }
}
