//! Command handler implementation.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use super::types::{CallbackAction, Keyboard, MenuAction, Reply};
use crate::config::BotConfig;
use crate::import::{is_charge_file_name, parse_charge_file, run_import};
use crate::monitor::MonitorMessage;
use crate::report::messages::{self as msg};
use crate::report::{format_date, local_now};
use crate::session::{Role, SessionStore, Verification};
use crate::sheets::{SheetWriter, SheetsRepository};
use crate::telegram::mask_phone;

/// Turns inbound user events into replies.
///
/// Every handler returns the replies in the order they should be sent;
/// nothing here talks to Telegram directly.
pub struct CommandHandler {
    repo: SheetsRepository,

    /// Shared with the monitor.
    sessions: Arc<RwLock<SessionStore>>,

    config: Arc<BotConfig>,

    /// Destination of bulk import rows.
    writer: Arc<dyn SheetWriter>,

    /// Asks the monitor for an early cycle after an import.
    monitor_tx: Option<mpsc::Sender<MonitorMessage>>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        repo: SheetsRepository,
        sessions: Arc<RwLock<SessionStore>>,
        config: Arc<BotConfig>,
        writer: Arc<dyn SheetWriter>,
    ) -> Self {
        Self {
            repo,
            sessions,
            config,
            writer,
            monitor_tx: None,
        }
    }

    /// Connects the handler to a running monitor.
    #[must_use]
    pub fn with_monitor(mut self, tx: mpsc::Sender<MonitorMessage>) -> Self {
        self.monitor_tx = Some(tx);
        self
    }

    /// `/start`: greets the user with the menu of their role.
    pub async fn handle_start(&self, user_id: i64, first_name: &str) -> Vec<Reply> {
        let sessions = self.sessions.read().await;
        let role = sessions.role(user_id);
        info!("User {} started the bot as {}", user_id, role);

        let reply = match role {
            Role::Client if sessions.is_authenticated(user_id) => {
                Reply::text(msg::greeting(first_name, "")).with_keyboard(Keyboard::ClientMenu)
            }
            Role::Client => Reply::text(msg::greeting(first_name, msg::CONFIRM_PHONE))
                .with_keyboard(Keyboard::PhoneRequest),
            Role::Manager => Reply::text(msg::greeting(first_name, msg::MANAGER_WELCOME))
                .with_keyboard(Keyboard::ManagerMenu),
            Role::Investor => Reply::text(msg::greeting(first_name, msg::INVESTOR_WELCOME))
                .with_keyboard(Keyboard::InvestorMenu),
            Role::SuperUser => Reply::text(msg::greeting(first_name, msg::CHOOSE_ROLE))
                .with_keyboard(Keyboard::RoleChoice),
        };
        vec![reply]
    }

    /// Shared contact. Starts verification for unauthenticated clients and
    /// shows the balance card to everyone else.
    pub async fn handle_contact(
        &self,
        user_id: i64,
        contact_user_id: Option<i64>,
        phone: &str,
    ) -> Vec<Reply> {
        if contact_user_id != Some(user_id) {
            return vec![Reply::text(msg::SHARE_OWN_CONTACT)];
        }

        info!("User {} shared phone {}", user_id, mask_phone(phone));
        let needs_verification = {
            let mut sessions = self.sessions.write().await;
            sessions.save_phone(user_id, phone);
            sessions.role(user_id) == Role::Client && !sessions.is_authenticated(user_id)
        };

        if !needs_verification {
            return self.balance_request(user_id, phone).await;
        }

        let text = match self.repo.find_by_phone(phone).await {
            Ok(Some(record)) if !record.code.trim().is_empty() => {
                debug!("Phone {} matched code {}", mask_phone(phone), record.code);
                self.sessions.write().await.set_pending(user_id, record);
                msg::ASK_CODE
            }
            Ok(_) => {
                info!("Phone {} is not registered", mask_phone(phone));
                msg::NOT_REGISTERED
            }
            Err(e) => {
                warn!("Phone lookup failed: {}", e);
                msg::TECHNICAL_ERROR
            }
        };
        vec![Reply::text(text).with_keyboard(Keyboard::Remove)]
    }

    /// Menu buttons, or a verification code from a pending client.
    pub async fn handle_text(&self, user_id: i64, text: &str) -> Vec<Reply> {
        let (role, authenticated) = {
            let sessions = self.sessions.read().await;
            (sessions.acting_role(user_id), sessions.is_authenticated(user_id))
        };

        match (role, MenuAction::parse(text)) {
            (Role::Client, Some(action)) if authenticated => {
                self.client_menu(user_id, action).await
            }
            (Role::Manager, Some(MenuAction::Air)) => {
                vec![self.positive_balances_reply(false).await]
            }
            (Role::Manager, Some(MenuAction::Container)) => {
                vec![self.container_list_reply(false).await]
            }
            (Role::Investor, Some(MenuAction::Profit)) => vec![
                Reply::text(msg::PICK_YEAR)
                    .with_keyboard(Keyboard::Years(self.config.investor_years())),
            ],
            (Role::Client, _) if !authenticated => self.verify_code(user_id, text).await,
            _ => {
                debug!("Ignoring text from {}", user_id);
                Vec::new()
            }
        }
    }

    /// Inline button presses. Replies edit the message that carried the
    /// button.
    pub async fn handle_callback(&self, user_id: i64, data: &str) -> Vec<Reply> {
        let role = self.sessions.read().await.role(user_id);
        debug!("User {} pressed {}", user_id, data);

        let Some(action) = CallbackAction::parse(data).filter(|a| allowed(role, *a)) else {
            return vec![Reply::edit(msg::UNKNOWN_COMMAND)];
        };
        let is_super = role == Role::SuperUser;

        let reply = match action {
            CallbackAction::ActAsManager => {
                self.sessions.write().await.assign_role(user_id, Role::Manager);
                Reply::edit(msg::MANAGER_PANEL)
                    .with_keyboard(Keyboard::ManagerPanel { back_to_role: true })
            }
            CallbackAction::ActAsInvestor => {
                self.sessions.write().await.assign_role(user_id, Role::Investor);
                Reply::edit(msg::INVESTOR_PANEL)
                    .with_keyboard(Keyboard::InvestorPanel { back_to_role: true })
            }
            CallbackAction::BackToRoleChoice => {
                self.sessions.write().await.assign_role(user_id, Role::SuperUser);
                Reply::edit(msg::CHOOSE_ROLE).with_keyboard(Keyboard::RoleChoice)
            }
            CallbackAction::BackToManager => Reply::edit(msg::MANAGER_PANEL)
                .with_keyboard(Keyboard::ManagerPanel { back_to_role: is_super }),
            CallbackAction::DebtorsMenu => {
                Reply::edit(msg::DEBTORS_MENU).with_keyboard(Keyboard::DebtorsMenu)
            }
            CallbackAction::PositiveBalances => self
                .positive_balances_reply(true)
                .await
                .with_keyboard(Keyboard::DebtorsMenu),
            CallbackAction::Containers => self
                .container_list_reply(true)
                .await
                .with_keyboard(Keyboard::Back(CallbackAction::DebtorsMenu)),
            CallbackAction::Debtors => self
                .debtors_reply()
                .await
                .with_keyboard(Keyboard::Back(CallbackAction::DebtorsMenu)),
            CallbackAction::Profit | CallbackAction::BackToYears => Reply::edit(msg::PICK_YEAR)
                .with_keyboard(Keyboard::Years(self.config.investor_years())),
            CallbackAction::Year(year) => {
                if !self.config.investor_years().contains(&year) {
                    return vec![Reply::edit(msg::UNKNOWN_COMMAND)];
                }
                Reply::edit(msg::pick_month(year)).with_keyboard(Keyboard::Months(year))
            }
            CallbackAction::Month { year, month } => self
                .profit_reply(user_id, year, month)
                .await
                .with_keyboard(Keyboard::Months(year)),
        };
        vec![reply]
    }

    /// Rejection for an upload the user may not make, checked before the
    /// file is downloaded.
    pub async fn check_upload(&self, user_id: i64, file_name: &str) -> Option<Reply> {
        let role = self.sessions.read().await.role(user_id);
        if !matches!(role, Role::Manager | Role::SuperUser) {
            info!("User {} ({}) may not upload files", user_id, role);
            return Some(Reply::text(msg::NO_UPLOAD_RIGHTS));
        }
        if !is_charge_file_name(file_name) {
            return Some(Reply::text(msg::UNSUPPORTED_FILE));
        }
        None
    }

    /// Uploaded charge file: imports it and reports the counters.
    pub async fn handle_document(
        &self,
        user_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> Vec<Reply> {
        if let Some(rejection) = self.check_upload(user_id, file_name).await {
            return vec![rejection];
        }
        let is_super = self.sessions.read().await.role(user_id) == Role::SuperUser;
        info!("User {} uploaded {} ({} bytes)", user_id, file_name, content.len());

        let result = match parse_charge_file(content) {
            Ok(lines) => {
                let today = format_date(&local_now());
                run_import(&self.repo, self.writer.as_ref(), &lines, file_name, &today).await
            }
            Err(e) => Err(e),
        };

        let summary = match result {
            Ok(summary) => {
                if summary.updated > 0 {
                    self.request_poll();
                }
                Reply::text(msg::import_summary(&summary))
            }
            Err(e) => {
                warn!("Import of {} failed: {}", file_name, e);
                Reply::text(msg::import_failed(&e.to_string()))
            }
        };

        vec![
            summary,
            Reply::text(msg::NEXT_ACTION)
                .with_keyboard(Keyboard::ManagerPanel { back_to_role: is_super }),
        ]
    }

    async fn verify_code(&self, user_id: i64, text: &str) -> Vec<Reply> {
        let outcome = self.sessions.write().await.verify_code(user_id, text);
        match outcome {
            Verification::Accepted(user) => vec![
                Reply::text(msg::welcome_authenticated(&user.name))
                    .with_keyboard(Keyboard::ClientMenu),
            ],
            Verification::Rejected => {
                info!("User {} entered a wrong code", user_id);
                vec![Reply::text(msg::WRONG_CODE)]
            }
            Verification::NotPending => Vec::new(),
        }
    }

    async fn client_menu(&self, user_id: i64, action: MenuAction) -> Vec<Reply> {
        let phone = {
            let sessions = self.sessions.read().await;
            sessions
                .authenticated(user_id)
                .map(|u| u.phone.clone())
                .or_else(|| sessions.phone(user_id).map(str::to_owned))
        };
        let Some(phone) = phone else {
            return vec![Reply::text(msg::PHONE_MISSING)];
        };

        match action {
            MenuAction::Air => self.balance_request(user_id, &phone).await,
            MenuAction::Container => self.container_request(&phone).await,
            MenuAction::TotalBalance => self.total_request(&phone).await,
            MenuAction::Profit => Vec::new(),
        }
    }

    async fn balance_request(&self, user_id: i64, phone: &str) -> Vec<Reply> {
        let text = match self.repo.find_by_phone(phone).await {
            Ok(Some(record)) => msg::balance_card(&record, &local_now()),
            Ok(None) => msg::BALANCE_NOT_FOUND.to_owned(),
            Err(e) => {
                warn!("Balance lookup failed: {}", e);
                msg::TECHNICAL_ERROR.to_owned()
            }
        };

        let mut replies = vec![Reply::text(text).with_keyboard(Keyboard::Remove)];
        if self.sessions.read().await.role(user_id) == Role::Client {
            replies.push(menu_refresh());
        }
        replies
    }

    async fn container_request(&self, phone: &str) -> Vec<Reply> {
        let text = match self.container_for_phone(phone).await {
            Ok(Some(Some(record))) => msg::container_card(&record, &local_now()),
            Ok(Some(None)) => msg::CONTAINER_NOT_FOUND.to_owned(),
            Ok(None) => msg::CODE_MISSING.to_owned(),
            Err(e) => {
                warn!("Container lookup failed: {}", e);
                msg::TECHNICAL_ERROR.to_owned()
            }
        };
        vec![Reply::text(text).with_keyboard(Keyboard::Remove), menu_refresh()]
    }

    /// Outer `None`: no code for the phone. Inner `None`: no visible charge.
    async fn container_for_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Option<crate::sheets::ContainerRecord>>, crate::sheets::SheetsError> {
        let Some(record) = self.repo.find_by_phone(phone).await? else {
            return Ok(None);
        };
        if record.code.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(self.repo.find_container(&record.code).await?))
    }

    async fn total_request(&self, phone: &str) -> Vec<Reply> {
        let air = self.repo.find_by_phone(phone).await;
        let reply = match air {
            Ok(air) => {
                let container = match air.as_ref().filter(|r| !r.code.trim().is_empty()) {
                    Some(record) => self.repo.find_container(&record.code).await,
                    None => Ok(None),
                };
                match container {
                    Ok(container) => Reply::text(msg::total_balance(
                        air.as_ref(),
                        container.as_ref(),
                        &local_now(),
                    ))
                    .markdown(),
                    Err(e) => {
                        warn!("Container lookup failed: {}", e);
                        Reply::text(msg::TECHNICAL_ERROR)
                    }
                }
            }
            Err(e) => {
                warn!("Balance lookup failed: {}", e);
                Reply::text(msg::TECHNICAL_ERROR)
            }
        };
        vec![reply.with_keyboard(Keyboard::Remove), menu_refresh()]
    }

    async fn positive_balances_reply(&self, edit: bool) -> Reply {
        let min = self.config.list_minimum;
        match self.repo.positive_balances(min).await {
            Ok(records) => {
                reply(edit, msg::positive_balances(&records, min, &local_now())).markdown()
            }
            Err(e) => {
                warn!("Positive balance list failed: {}", e);
                reply(edit, msg::LIST_FAILED)
            }
        }
    }

    async fn container_list_reply(&self, edit: bool) -> Reply {
        let min = self.repo.container_threshold();
        match self.repo.containers().await {
            Ok(records) => {
                reply(edit, msg::container_list(&records, min, &local_now())).markdown()
            }
            Err(e) => {
                warn!("Container list failed: {}", e);
                reply(edit, msg::LIST_FAILED)
            }
        }
    }

    async fn debtors_reply(&self) -> Reply {
        let min = self.config.list_minimum;
        match self.repo.debtors(min).await {
            Ok(records) => Reply::edit(msg::debtors(&records, min, &local_now())).markdown(),
            Err(e) => {
                warn!("Debtors list failed: {}", e);
                Reply::edit(msg::LIST_FAILED)
            }
        }
    }

    async fn profit_reply(&self, user_id: i64, year: i32, month: u32) -> Reply {
        let Some(investor) = self.config.investor(user_id) else {
            return Reply::edit(msg::NO_INVESTOR_SHEET);
        };

        let Some(column) = investor.column_for(month) else {
            debug!("No column for month {} in sheet of {}", month, investor.name);
            return Reply::edit(msg::investor_profit(&[], year, month, &local_now())).markdown();
        };

        let period = format!("{year}.{month:02}");
        match self.repo.investor_profit(&investor.sheet, column, &period).await {
            Ok(entries) => {
                Reply::edit(msg::investor_profit(&entries, year, month, &local_now())).markdown()
            }
            Err(e) => {
                warn!("Profit sheet of {} failed: {}", investor.name, e);
                Reply::edit(msg::profit_failed(year, month))
            }
        }
    }

    fn request_poll(&self) {
        let Some(tx) = &self.monitor_tx else {
            return;
        };
        if let Err(e) = tx.try_send(MonitorMessage::PollNow) {
            debug!("Monitor poll request not queued: {}", e);
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("repo", &self.repo)
            .field("has_monitor", &self.monitor_tx.is_some())
            .finish_non_exhaustive()
    }
}

fn reply(edit: bool, text: impl Into<String>) -> Reply {
    if edit {
        Reply::edit(text)
    } else {
        Reply::text(text)
    }
}

fn menu_refresh() -> Reply {
    Reply::text(msg::MENU_REFRESH).with_keyboard(Keyboard::ClientMenu)
}

/// Whether a role may press a button. Super users may press all of them.
fn allowed(role: Role, action: CallbackAction) -> bool {
    match action {
        CallbackAction::ActAsManager
        | CallbackAction::ActAsInvestor
        | CallbackAction::BackToRoleChoice => role == Role::SuperUser,
        CallbackAction::BackToManager
        | CallbackAction::DebtorsMenu
        | CallbackAction::PositiveBalances
        | CallbackAction::Containers
        | CallbackAction::Debtors => matches!(role, Role::Manager | Role::SuperUser),
        CallbackAction::Profit
        | CallbackAction::Year(_)
        | CallbackAction::Month { .. }
        | CallbackAction::BackToYears => matches!(role, Role::Investor | Role::SuperUser),
    }
}
