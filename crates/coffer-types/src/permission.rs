//! permission levels and the actions they gate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// an ordered privilege level: `view < edit < admin < owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// read only.
    View,
    /// read and update.
    Edit,
    /// everything except being the creator.
    Admin,
    /// the identity that created the resource.
    Owner,
}

impl Permission {
    /// every level, lowest first.
    pub const ALL: [Permission; 4] = [
        Permission::View,
        Permission::Edit,
        Permission::Admin,
        Permission::Owner,
    ];

    /// the stored name of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
            Permission::Admin => "admin",
            Permission::Owner => "owner",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPermission(s.to_string()))
    }
}

/// an operation a caller wants to perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// create something under the resource.
    Create,
    /// read the resource.
    Read,
    /// modify the resource or its assignments.
    Update,
    /// delete the resource or revoke assignments on it.
    Delete,
}

impl Action {
    /// every action.
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    /// the whitelist of levels sufficient for this action.
    ///
    /// membership is exact; there is no implied ordering beyond what
    /// each list names.
    pub fn sufficient(self) -> &'static [Permission] {
        match self {
            Action::Create | Action::Delete => &[Permission::Admin, Permission::Owner],
            Action::Update => &[Permission::Edit, Permission::Admin, Permission::Owner],
            Action::Read => &Permission::ALL,
        }
    }

    /// whether holding `level` is enough for this action.
    pub fn permits(self, level: Permission) -> bool {
        self.sufficient().contains(&level)
    }

    /// the stored name of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Permission::View < Permission::Edit);
        assert!(Permission::Edit < Permission::Admin);
        assert!(Permission::Admin < Permission::Owner);
    }

    #[test]
    fn test_whitelists() {
        use Permission::*;

        let table = [
            (Action::Create, [false, false, true, true]),
            (Action::Read, [true, true, true, true]),
            (Action::Update, [false, true, true, true]),
            (Action::Delete, [false, false, true, true]),
        ];

        for (action, expected) in table {
            for (level, allowed) in [View, Edit, Admin, Owner].into_iter().zip(expected) {
                assert_eq!(
                    action.permits(level),
                    allowed,
                    "{action} with {level} should be {allowed}"
                );
            }
        }
    }

    #[test]
    fn test_parse_exact_names_only() {
        assert_eq!("admin".parse::<Permission>().unwrap(), Permission::Admin);
        // substring of a valid name is not a valid name
        assert!("own".parse::<Permission>().is_err());
        assert!("view,edit".parse::<Permission>().is_err());
        assert!("Owner".parse::<Permission>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Permission::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let action: Action = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(action, Action::Delete);
    }
}
