//! internal ids, resources and identities.
//!
//! numeric ids never leave the process; callers see [`crate::Pid`]s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, PidKind};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// internal key of a user.
    UserId
);
numeric_id!(
    /// internal key of a group.
    GroupId
);
numeric_id!(
    /// internal key of a vault.
    VaultId
);
numeric_id!(
    /// internal key of a credential envelope.
    CredentialId
);
numeric_id!(
    /// internal key of a permission assignment.
    AssignmentId
);

/// the kind of thing permissions are granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// a vault.
    Vault,
    /// a credential.
    Credential,
    /// a group.
    Group,
}

impl ResourceType {
    /// stored tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Vault => "vault",
            ResourceType::Credential => "credential",
            ResourceType::Group => "group",
        }
    }

    /// the pid kind that names resources of this type.
    pub fn pid_kind(self) -> PidKind {
        match self {
            ResourceType::Vault => PidKind::Vault,
            ResourceType::Credential => PidKind::Credential,
            ResourceType::Group => PidKind::Group,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vault" => Ok(ResourceType::Vault),
            "credential" => Ok(ResourceType::Credential),
            "group" => Ok(ResourceType::Group),
            other => Err(Error::UnknownResourceType(other.to_string())),
        }
    }
}

/// the kind of thing that holds permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    /// a user.
    User,
    /// a group.
    Group,
}

impl IdentityType {
    /// stored tag.
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityType::User => "user",
            IdentityType::Group => "group",
        }
    }

    /// the pid kind that names identities of this type.
    pub fn pid_kind(self) -> PidKind {
        match self {
            IdentityType::User => PidKind::User,
            IdentityType::Group => PidKind::Group,
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(IdentityType::User),
            "group" => Ok(IdentityType::Group),
            other => Err(Error::UnknownIdentityType(other.to_string())),
        }
    }
}

/// a resource, by internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Resource {
    /// a vault.
    Vault(VaultId),
    /// a credential.
    Credential(CredentialId),
    /// a group.
    Group(GroupId),
}

impl Resource {
    /// the type tag.
    pub fn resource_type(self) -> ResourceType {
        match self {
            Resource::Vault(_) => ResourceType::Vault,
            Resource::Credential(_) => ResourceType::Credential,
            Resource::Group(_) => ResourceType::Group,
        }
    }

    /// the raw numeric key.
    pub fn raw_id(self) -> u64 {
        match self {
            Resource::Vault(id) => id.0,
            Resource::Credential(id) => id.0,
            Resource::Group(id) => id.0,
        }
    }

    /// rebuild from a stored (type, key) pair.
    pub fn from_parts(resource_type: ResourceType, id: u64) -> Self {
        match resource_type {
            ResourceType::Vault => Resource::Vault(VaultId(id)),
            ResourceType::Credential => Resource::Credential(CredentialId(id)),
            ResourceType::Group => Resource::Group(GroupId(id)),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type(), self.raw_id())
    }
}

/// an identity, by internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Identity {
    /// a user.
    User(UserId),
    /// a group.
    Group(GroupId),
}

impl Identity {
    /// the type tag.
    pub fn identity_type(self) -> IdentityType {
        match self {
            Identity::User(_) => IdentityType::User,
            Identity::Group(_) => IdentityType::Group,
        }
    }

    /// the raw numeric key.
    pub fn raw_id(self) -> u64 {
        match self {
            Identity::User(id) => id.0,
            Identity::Group(id) => id.0,
        }
    }

    /// rebuild from a stored (type, key) pair.
    pub fn from_parts(identity_type: IdentityType, id: u64) -> Self {
        match identity_type {
            IdentityType::User => Identity::User(UserId(id)),
            IdentityType::Group => Identity::Group(GroupId(id)),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity_type(), self.raw_id())
    }
}
