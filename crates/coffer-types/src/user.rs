//! users and groups - the identities permissions are attached to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GroupId, Pid, PidKind, UserId};

/// a coffer user.
///
/// every user has exactly one personal vault, created alongside the user.
/// the public key is opaque to coffer; collaborators use it to encrypt key
/// shares before granting access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// internal key.
    pub id: UserId,

    /// public identifier.
    pub pid: Pid,

    /// unique account name.
    pub name: String,

    /// email address, if known.
    pub email: Option<String>,

    /// public key bytes used for secret distribution.
    #[serde(default)]
    pub public_key: Vec<u8>,

    /// when the user was created.
    pub created_at: DateTime<Utc>,

    /// when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// create a new, unsaved user with a fresh pid.
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId(0),
            pid: Pid::generate(PidKind::User),
            name,
            email: None,
            public_key: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// a named group of users.
///
/// membership is not stored here; a user is a member when they hold any
/// assignment on the group resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// internal key.
    pub id: GroupId,

    /// public identifier.
    pub pid: Pid,

    /// display name.
    pub name: String,

    /// free-form description.
    #[serde(default)]
    pub description: String,

    /// when the group was created.
    pub created_at: DateTime<Utc>,

    /// when the group was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// create a new, unsaved group with a fresh pid.
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: GroupId(0),
            pid: Pid::generate(PidKind::Group),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}
