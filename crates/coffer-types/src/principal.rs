//! the resolved caller of an operation.

use serde::{Deserialize, Serialize};

use crate::Pid;

/// how the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// an ordinary user session.
    User,
    /// an administrative session. carries no extra permissions.
    Admin,
}

/// the caller, as resolved by the token layer.
///
/// coffer never sees the token itself, only the user pid it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// the calling user.
    pub user_pid: Pid,
    /// session kind.
    pub kind: PrincipalKind,
}

impl Principal {
    /// a user principal.
    pub fn user(user_pid: Pid) -> Self {
        Self {
            user_pid,
            kind: PrincipalKind::User,
        }
    }

    /// an admin principal.
    pub fn admin(user_pid: Pid) -> Self {
        Self {
            user_pid,
            kind: PrincipalKind::Admin,
        }
    }
}
