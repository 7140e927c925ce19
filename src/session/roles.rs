//! User roles resolved from static id lists.

use std::collections::HashSet;

use crate::config::RolesConfig;

/// What a Telegram user may do with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Chooses to act as manager or investor.
    SuperUser,
    /// Sees every customer and uploads charge files.
    Manager,
    /// Sees monthly profit reports.
    Investor,
    /// Customer; must authenticate before seeing their balance.
    Client,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperUser => "super_user",
            Self::Manager => "manager",
            Self::Investor => "investor",
            Self::Client => "client",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static role lists, checked super user first, then manager, then investor.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    super_users: HashSet<i64>,
    managers: HashSet<i64>,
    investors: HashSet<i64>,
}

impl RoleDirectory {
    #[must_use]
    pub fn from_config(config: &RolesConfig) -> Self {
        Self {
            super_users: config.super_users.iter().copied().collect(),
            managers: config.managers.iter().copied().collect(),
            investors: config.investors.iter().copied().collect(),
        }
    }

    /// Role granted by the lists; unlisted users are clients.
    #[must_use]
    pub fn role_of(&self, user_id: i64) -> Role {
        if self.super_users.contains(&user_id) {
            Role::SuperUser
        } else if self.managers.contains(&user_id) {
            Role::Manager
        } else if self.investors.contains(&user_id) {
            Role::Investor
        } else {
            Role::Client
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let directory = RoleDirectory::from_config(&RolesConfig {
            super_users: vec![1],
            managers: vec![1, 2],
            investors: vec![2, 3],
        });

        assert_eq!(directory.role_of(1), Role::SuperUser);
        assert_eq!(directory.role_of(2), Role::Manager);
        assert_eq!(directory.role_of(3), Role::Investor);
        assert_eq!(directory.role_of(4), Role::Client);
    }
}
