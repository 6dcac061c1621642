//! vaults: named containers of credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Pid, PidKind, UserId, VaultId};

/// a vault.
///
/// credentials are linked through a join table rather than a foreign key,
/// so one credential can sit in several vaults and move between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    /// internal key.
    pub id: VaultId,

    /// public identifier.
    pub pid: Pid,

    /// display name.
    pub name: String,

    /// free-form description.
    #[serde(default)]
    pub description: String,

    /// public key bytes for the vault.
    #[serde(default)]
    pub public_key: Vec<u8>,

    /// whether this is a user's personal vault.
    pub is_personal: bool,

    /// owner of a personal vault. `None` for shared vaults.
    pub personal_owner: Option<UserId>,

    /// when the vault was created.
    pub created_at: DateTime<Utc>,

    /// when the vault was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Vault {
    /// create a new, unsaved shared vault.
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: VaultId(0),
            pid: Pid::generate(PidKind::Vault),
            name,
            description,
            public_key: Vec::new(),
            is_personal: false,
            personal_owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// create a new, unsaved personal vault for `owner`.
    pub fn personal(owner: UserId, owner_name: &str) -> Self {
        let mut vault = Self::new(
            format!("{owner_name}'s vault"),
            "personal vault".to_string(),
        );
        vault.is_personal = true;
        vault.personal_owner = Some(owner);
        vault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_vault() {
        let vault = Vault::personal(UserId(9), "carol");
        assert!(vault.is_personal);
        assert_eq!(vault.personal_owner, Some(UserId(9)));
        assert_eq!(vault.name, "carol's vault");
        assert_eq!(vault.pid.kind(), PidKind::Vault);
    }

    #[test]
    fn test_shared_vault_has_no_owner() {
        let vault = Vault::new("team".to_string(), "shared".to_string());
        assert!(!vault.is_personal);
        assert!(vault.personal_owner.is_none());
    }
}
