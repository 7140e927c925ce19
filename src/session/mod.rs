//! Roles and per-user session state.

mod roles;
mod store;

pub use roles::{Role, RoleDirectory};
pub use store::{AuthenticatedUser, SessionStore, Verification};
