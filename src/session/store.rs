//! In-memory session state: roles, phones, authentication.
//!
//! Nothing here survives a restart; clients authenticate again.

use std::collections::HashMap;

use tracing::{debug, info};

use super::roles::{Role, RoleDirectory};
use crate::sheets::{BalanceRecord, normalize_phone};

/// A client that confirmed their code.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    /// Phone as written in the balances sheet.
    pub phone: String,
    pub name: String,
    pub code: String,
    pub list_name: String,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn from_record(user_id: i64, record: &BalanceRecord) -> Self {
        Self {
            user_id,
            phone: record.phone.clone(),
            name: record.name.clone(),
            code: record.code.clone(),
            list_name: record.list_name.clone(),
        }
    }

    /// Digits-only phone, comparable with balance snapshot keys.
    #[must_use]
    pub fn phone_key(&self) -> String {
        normalize_phone(&self.phone)
    }
}

/// Result of checking a submitted verification code.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The user has no pending verification.
    NotPending,
    /// Code matched; the user is now authenticated.
    Accepted(AuthenticatedUser),
    /// Code did not match; the pending entry is kept.
    Rejected,
}

/// Per-user state shared between the dispatcher and the monitor.
#[derive(Debug, Default)]
pub struct SessionStore {
    directory: RoleDirectory,
    acting: HashMap<i64, Role>,
    phones: HashMap<i64, String>,
    authenticated: HashMap<i64, AuthenticatedUser>,
    pending: HashMap<i64, BalanceRecord>,
}

impl SessionStore {
    #[must_use]
    pub fn new(directory: RoleDirectory) -> Self {
        Self {
            directory,
            ..Self::default()
        }
    }

    /// Role granted by configuration.
    #[must_use]
    pub fn role(&self, user_id: i64) -> Role {
        self.directory.role_of(user_id)
    }

    /// Role the user currently acts in. Differs from [`Self::role`] only for
    /// super users that picked a panel.
    #[must_use]
    pub fn acting_role(&self, user_id: i64) -> Role {
        match self.role(user_id) {
            Role::SuperUser => self
                .acting
                .get(&user_id)
                .copied()
                .unwrap_or(Role::SuperUser),
            role => role,
        }
    }

    /// Lets a super user act as manager or investor, or return to the picker
    /// with [`Role::SuperUser`].
    ///
    /// Returns `false` (and changes nothing) for anyone else.
    pub fn assign_role(&mut self, user_id: i64, role: Role) -> bool {
        if self.role(user_id) != Role::SuperUser {
            return false;
        }

        match role {
            Role::Manager | Role::Investor => {
                self.acting.insert(user_id, role);
            }
            Role::SuperUser => {
                self.acting.remove(&user_id);
            }
            Role::Client => return false,
        }

        debug!("User {} now acts as {}", user_id, role);
        true
    }

    pub fn save_phone(&mut self, user_id: i64, phone: impl Into<String>) {
        self.phones.insert(user_id, phone.into());
    }

    /// Last phone the user shared.
    #[must_use]
    pub fn phone(&self, user_id: i64) -> Option<&str> {
        self.phones.get(&user_id).map(String::as_str)
    }

    pub fn set_pending(&mut self, user_id: i64, record: BalanceRecord) {
        self.pending.insert(user_id, record);
    }

    #[must_use]
    pub fn pending(&self, user_id: i64) -> Option<&BalanceRecord> {
        self.pending.get(&user_id)
    }

    pub fn remove_pending(&mut self, user_id: i64) -> Option<BalanceRecord> {
        self.pending.remove(&user_id)
    }

    /// Authenticates the user as the owner of `record`, clearing any pending
    /// verification.
    pub fn mark_authenticated(&mut self, user_id: i64, record: &BalanceRecord) -> AuthenticatedUser {
        self.pending.remove(&user_id);
        let user = AuthenticatedUser::from_record(user_id, record);
        self.authenticated.insert(user_id, user.clone());
        info!("User {} authenticated as code {}", user_id, user.code);
        user
    }

    /// Checks a submitted code against the user's pending verification.
    pub fn verify_code(&mut self, user_id: i64, entered: &str) -> Verification {
        let Some(record) = self.pending.get(&user_id) else {
            return Verification::NotPending;
        };

        if entered.trim() != record.code.trim() {
            return Verification::Rejected;
        }

        let record = record.clone();
        Verification::Accepted(self.mark_authenticated(user_id, &record))
    }

    #[must_use]
    pub fn is_authenticated(&self, user_id: i64) -> bool {
        self.authenticated.contains_key(&user_id)
    }

    #[must_use]
    pub fn authenticated(&self, user_id: i64) -> Option<&AuthenticatedUser> {
        self.authenticated.get(&user_id)
    }

    /// Every authenticated user, ordered by id.
    #[must_use]
    pub fn list_authenticated(&self) -> Vec<&AuthenticatedUser> {
        let mut users: Vec<_> = self.authenticated.values().collect();
        users.sort_by_key(|u| u.user_id);
        users
    }

    /// Authenticated user whose phone digits equal a balance snapshot key.
    #[must_use]
    pub fn user_for_phone_key(&self, key: &str) -> Option<&AuthenticatedUser> {
        self.list_authenticated()
            .into_iter()
            .find(|u| u.phone_key() == key)
    }

    /// Authenticated user whose code equals a container code.
    #[must_use]
    pub fn user_for_code(&self, code: &str) -> Option<&AuthenticatedUser> {
        self.list_authenticated()
            .into_iter()
            .find(|u| u.code == code)
    }
}
