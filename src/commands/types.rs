//! Inbound actions and outbound replies.

use std::fmt;

pub const BUTTON_AIR: &str = "✈️ Air";
pub const BUTTON_CONTAINER: &str = "📦 Container";
pub const BUTTON_TOTAL: &str = "💰 Umumiy balans";
pub const BUTTON_PROFIT: &str = "📈 Foyda";
pub const BUTTON_SHARE_PHONE: &str = "📱 Telefon raqamni yuborish";

/// Reply keyboard buttons a user can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Air,
    Container,
    TotalBalance,
    Profit,
}

impl MenuAction {
    /// Recognizes a button text. Anything else is free text.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            BUTTON_AIR => Some(Self::Air),
            BUTTON_CONTAINER => Some(Self::Container),
            BUTTON_TOTAL => Some(Self::TotalBalance),
            BUTTON_PROFIT => Some(Self::Profit),
            _ => None,
        }
    }
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Super user acts as a manager.
    ActAsManager,

    /// Super user acts as an investor.
    ActAsInvestor,

    /// Back to the super user role picker.
    BackToRoleChoice,

    /// Back to the manager panel.
    BackToManager,

    /// Manager debtors section.
    DebtorsMenu,

    /// Customers with a positive air balance.
    PositiveBalances,

    /// Visible container charges.
    Containers,

    /// Customers in debt.
    Debtors,

    /// Investor year picker.
    Profit,

    /// Month picker for a year.
    Year(i32),

    /// Profit table of one month.
    Month { year: i32, month: u32 },

    /// Back from the month picker to the year picker.
    BackToYears,
}

impl CallbackAction {
    /// Parses callback data produced by [`Self::data`].
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "super_role_manager" => Some(Self::ActAsManager),
            "super_role_investor" => Some(Self::ActAsInvestor),
            "back_to_super_user" => Some(Self::BackToRoleChoice),
            "back_to_manager" => Some(Self::BackToManager),
            "manager_debtors_menu" => Some(Self::DebtorsMenu),
            "manager_air" => Some(Self::PositiveBalances),
            "manager_container" => Some(Self::Containers),
            "manager_debtors" => Some(Self::Debtors),
            "investor_profit" => Some(Self::Profit),
            "investor_back_to_years" => Some(Self::BackToYears),
            _ => Self::parse_period(data),
        }
    }

    /// `investor_year_2025` and `investor_month_2025_09`.
    fn parse_period(data: &str) -> Option<Self> {
        if let Some(year) = data.strip_prefix("investor_year_") {
            return year.parse().ok().map(Self::Year);
        }

        let (year, month) = data.strip_prefix("investor_month_")?.split_once('_')?;
        let year = year.parse().ok()?;
        let month = month.parse().ok().filter(|m| (1..=12).contains(m))?;
        Some(Self::Month { year, month })
    }

    /// Callback data sent with the inline button.
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::ActAsManager => "super_role_manager".to_owned(),
            Self::ActAsInvestor => "super_role_investor".to_owned(),
            Self::BackToRoleChoice => "back_to_super_user".to_owned(),
            Self::BackToManager => "back_to_manager".to_owned(),
            Self::DebtorsMenu => "manager_debtors_menu".to_owned(),
            Self::PositiveBalances => "manager_air".to_owned(),
            Self::Containers => "manager_container".to_owned(),
            Self::Debtors => "manager_debtors".to_owned(),
            Self::Profit => "investor_profit".to_owned(),
            Self::Year(year) => format!("investor_year_{year}"),
            Self::Month { year, month } => format!("investor_month_{year}_{month:02}"),
            Self::BackToYears => "investor_back_to_years".to_owned(),
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data())
    }
}

/// Keyboard attached to a reply.
///
/// Transport independent; the Telegram layer maps each variant to a
/// concrete markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Removes the current reply keyboard.
    Remove,

    /// One button asking for the user's own contact.
    PhoneRequest,

    /// Persistent client menu.
    ClientMenu,

    /// Persistent manager menu.
    ManagerMenu,

    /// Persistent investor menu.
    InvestorMenu,

    /// Inline super user role picker.
    RoleChoice,

    /// Inline manager panel.
    ManagerPanel { back_to_role: bool },

    /// Inline investor panel.
    InvestorPanel { back_to_role: bool },

    /// Inline debtors section.
    DebtorsMenu,

    /// A single inline back button.
    Back(CallbackAction),

    /// Inline year picker.
    Years(Vec<i32>),

    /// Inline month picker for a year.
    Months(i32),
}

impl Keyboard {
    /// Inline keyboards can be attached to edited messages; reply keyboards
    /// cannot.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        !matches!(
            self,
            Self::Remove
                | Self::PhoneRequest
                | Self::ClientMenu
                | Self::ManagerMenu
                | Self::InvestorMenu
        )
    }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,

    pub keyboard: Option<Keyboard>,

    /// Render the text as Markdown.
    pub markdown: bool,

    /// Replace the message the triggering button belongs to instead of
    /// sending a new one.
    pub edit: bool,
}

impl Reply {
    /// Creates a plain new message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            markdown: false,
            edit: false,
        }
    }

    /// Creates an edit of the message carrying the pressed button.
    #[must_use]
    pub fn edit(text: impl Into<String>) -> Self {
        Self {
            edit: true,
            ..Self::text(text)
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    #[must_use]
    pub const fn markdown(mut self) -> Self {
        self.markdown = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_menu_buttons() {
        assert_eq!(MenuAction::parse("✈️ Air"), Some(MenuAction::Air));
        assert_eq!(MenuAction::parse(" 📦 Container "), Some(MenuAction::Container));
        assert_eq!(MenuAction::parse("💰 Umumiy balans"), Some(MenuAction::TotalBalance));
        assert_eq!(MenuAction::parse("📈 Foyda"), Some(MenuAction::Profit));
        assert_eq!(MenuAction::parse("1111"), None);
    }

    #[test]
    fn test_callback_data_is_stable() {
        let actions = [
            CallbackAction::ActAsManager,
            CallbackAction::ActAsInvestor,
            CallbackAction::BackToRoleChoice,
            CallbackAction::BackToManager,
            CallbackAction::DebtorsMenu,
            CallbackAction::PositiveBalances,
            CallbackAction::Containers,
            CallbackAction::Debtors,
            CallbackAction::Profit,
            CallbackAction::Year(2026),
            CallbackAction::Month { year: 2025, month: 9 },
            CallbackAction::BackToYears,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }

    #[test]
    fn test_month_data_is_zero_padded() {
        assert_eq!(
            CallbackAction::Month { year: 2025, month: 3 }.data(),
            "investor_month_2025_03"
        );
    }

    #[test]
    fn test_parse_rejects_unknown_data() {
        assert_eq!(CallbackAction::parse("role_client"), None);
        assert_eq!(CallbackAction::parse("investor_year_abc"), None);
        assert_eq!(CallbackAction::parse("investor_month_2025_13"), None);
        assert_eq!(CallbackAction::parse("investor_month_2025"), None);
    }

    #[test]
    fn test_edit_reply_builder() {
        let reply = Reply::edit("x")
            .with_keyboard(Keyboard::DebtorsMenu)
            .markdown();
        assert!(reply.edit);
        assert!(reply.markdown);
        assert!(reply.keyboard.as_ref().is_some_and(Keyboard::is_inline));
        assert!(!Keyboard::ClientMenu.is_inline());
    }
}
