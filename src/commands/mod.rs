//! Command handling module.
//!
//! Turns `/start`, shared contacts, menu buttons, inline callbacks and
//! uploaded charge files into replies. Nothing here depends on the
//! Telegram transport.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{
    BUTTON_AIR, BUTTON_CONTAINER, BUTTON_PROFIT, BUTTON_SHARE_PHONE, BUTTON_TOTAL,
    CallbackAction, Keyboard, MenuAction, Reply,
};
