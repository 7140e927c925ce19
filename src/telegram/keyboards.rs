//! Mapping of transport-independent keyboards to Telegram markups.

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

use crate::commands::{
    BUTTON_AIR, BUTTON_CONTAINER, BUTTON_PROFIT, BUTTON_SHARE_PHONE, BUTTON_TOTAL,
    CallbackAction, Keyboard,
};
use crate::report::messages::month_name;

const YEARS_PER_ROW: usize = 2;
const MONTHS_PER_ROW: usize = 3;

/// Markup for a newly sent message.
#[must_use]
pub fn reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
        Keyboard::PhoneRequest => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![vec![
                KeyboardButton::new(BUTTON_SHARE_PHONE).request(ButtonRequest::Contact),
            ]])
            .resize_keyboard()
            .one_time_keyboard(),
        ),
        Keyboard::ClientMenu => persistent(vec![
            vec![BUTTON_AIR, BUTTON_CONTAINER],
            vec![BUTTON_TOTAL],
        ]),
        Keyboard::ManagerMenu => persistent(vec![vec![BUTTON_AIR, BUTTON_CONTAINER]]),
        Keyboard::InvestorMenu => persistent(vec![vec![BUTTON_PROFIT]]),
        inline => ReplyMarkup::InlineKeyboard(inline_rows(inline)),
    }
}

/// Markup for an edited message. Reply keyboards cannot be attached to
/// edits, so they yield `None`.
#[must_use]
pub fn inline_markup(keyboard: &Keyboard) -> Option<InlineKeyboardMarkup> {
    keyboard.is_inline().then(|| inline_rows(keyboard))
}

fn persistent(rows: Vec<Vec<&str>>) -> ReplyMarkup {
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>());
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.data())
}

fn back(action: CallbackAction) -> InlineKeyboardButton {
    button("🔙 Orqaga", action)
}

fn inline_rows(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = match keyboard {
        Keyboard::RoleChoice => vec![
            vec![button("👨‍💼 Manager", CallbackAction::ActAsManager)],
            vec![button("💰 Investor", CallbackAction::ActAsInvestor)],
        ],
        Keyboard::ManagerPanel { back_to_role } => {
            let mut rows = vec![vec![button("📋 Qarzdorlar", CallbackAction::DebtorsMenu)]];
            if *back_to_role {
                rows.push(vec![button("🔙 Rol tanlash", CallbackAction::BackToRoleChoice)]);
            }
            rows
        }
        Keyboard::InvestorPanel { back_to_role } => {
            let mut rows = vec![vec![button(BUTTON_PROFIT, CallbackAction::Profit)]];
            if *back_to_role {
                rows.push(vec![button("🔙 Rol tanlash", CallbackAction::BackToRoleChoice)]);
            }
            rows
        }
        Keyboard::DebtorsMenu => vec![
            vec![button(BUTTON_AIR, CallbackAction::PositiveBalances)],
            vec![button(BUTTON_CONTAINER, CallbackAction::Containers)],
            vec![button("📋 Qarzdorlar", CallbackAction::Debtors)],
            vec![back(CallbackAction::BackToManager)],
        ],
        Keyboard::Back(action) => vec![vec![back(*action)]],
        Keyboard::Years(years) => years
            .chunks(YEARS_PER_ROW)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|year| button(format!("📅 {year}"), CallbackAction::Year(*year)))
                    .collect()
            })
            .collect(),
        Keyboard::Months(year) => {
            let months: Vec<u32> = (1..=12).collect();
            let mut rows: Vec<Vec<_>> = months
                .chunks(MONTHS_PER_ROW)
                .map(|chunk| {
                    chunk
                        .iter()
                        .map(|&month| {
                            button(
                                format!("📌 {}", month_name(month)),
                                CallbackAction::Month { year: *year, month },
                            )
                        })
                        .collect()
                })
                .collect();
            rows.push(vec![back(CallbackAction::BackToYears)]);
            rows
        }
        Keyboard::Remove
        | Keyboard::PhoneRequest
        | Keyboard::ClientMenu
        | Keyboard::ManagerMenu
        | Keyboard::InvestorMenu => Vec::new(),
    };
    InlineKeyboardMarkup::new(rows)
}
