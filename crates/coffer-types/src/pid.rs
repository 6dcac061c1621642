//! validated public identifiers.
//!
//! a pid is the only identifier ever handed to callers. it must:
//! - Start with a known kind prefix followed by `_` (e.g. "cred_")
//! - Have exactly 32 lowercase hex characters (16 random bytes)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// length of the hex portion (16 bytes = 32 hex chars).
pub const PID_HEX_LEN: usize = 32;

/// the kind of row a pid names. determines its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PidKind {
    /// a user account.
    User,
    /// a group of users.
    Group,
    /// a vault.
    Vault,
    /// a credential envelope.
    Credential,
    /// a permission assignment edge.
    Assignment,
}

impl PidKind {
    /// all kinds, for prefix lookup.
    pub const ALL: [PidKind; 5] = [
        PidKind::User,
        PidKind::Group,
        PidKind::Vault,
        PidKind::Credential,
        PidKind::Assignment,
    ];

    /// the prefix (without separator) for this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            PidKind::User => "usr",
            PidKind::Group => "group",
            PidKind::Vault => "vault",
            PidKind::Credential => "cred",
            PidKind::Assignment => "perm",
        }
    }
}

impl fmt::Display for PidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// a validated public identifier such as `vault_3f2a...`.
///
/// # Example
/// ```
/// use coffer_types::{Pid, PidKind};
///
/// let pid = Pid::generate(PidKind::Vault);
/// assert_eq!(pid.kind(), PidKind::Vault);
/// assert!(pid.as_str().starts_with("vault_"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(String);

impl Pid {
    /// parse a pid, validating the prefix and hex body.
    pub fn new(s: impl Into<String>) -> Result<Self, PidError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// parse a pid and require it to be of the given kind.
    pub fn of_kind(s: impl Into<String>, kind: PidKind) -> Result<Self, PidError> {
        let pid = Self::new(s)?;
        if pid.kind() != kind {
            return Err(PidError::WrongKind {
                expected: kind,
                got: pid.kind(),
            });
        }
        Ok(pid)
    }

    /// generate a fresh random pid of the given kind.
    pub fn generate(kind: PidKind) -> Self {
        use rand::Rng;
        let bytes: [u8; PID_HEX_LEN / 2] = rand::rng().random();
        Self(format!("{}_{}", kind.prefix(), hex::encode(bytes)))
    }

    /// the kind encoded in the prefix.
    pub fn kind(&self) -> PidKind {
        // validated on construction, so one prefix always matches
        let (prefix, _) = self.0.split_once('_').unwrap_or_default();
        PidKind::ALL
            .into_iter()
            .find(|k| k.prefix() == prefix)
            .unwrap_or(PidKind::Assignment)
    }

    /// the full pid string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// consume the pid and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(s: &str) -> Result<(), PidError> {
        let Some((prefix, body)) = s.split_once('_') else {
            return Err(PidError::MissingPrefix);
        };

        if !PidKind::ALL.iter().any(|k| k.prefix() == prefix) {
            return Err(PidError::UnknownPrefix(prefix.to_string()));
        }

        if body.len() != PID_HEX_LEN {
            return Err(PidError::InvalidLength {
                expected: PID_HEX_LEN,
                got: body.len(),
            });
        }

        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(PidError::InvalidHex);
        }

        Ok(())
    }
}

impl AsRef<str> for Pid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Pid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Pid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// serde: deserialize with validation
impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pid::new(s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Pid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// error type for pid validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PidError {
    /// pid has no `<kind>_` prefix.
    #[error("pid must start with a kind prefix followed by '_'")]
    MissingPrefix,

    /// prefix is not one of the known kinds.
    #[error("unknown pid prefix: {0}")]
    UnknownPrefix(String),

    /// hex body has the wrong length.
    #[error("invalid pid length: expected {expected} hex chars, got {got}")]
    InvalidLength {
        /// expected length.
        expected: usize,
        /// actual length.
        got: usize,
    },

    /// body is not lowercase hex.
    #[error("pid body must be lowercase hex")]
    InvalidHex,

    /// pid is valid but names a different kind of row.
    #[error("expected a {expected} pid, got a {got} pid")]
    WrongKind {
        /// kind the caller asked for.
        expected: PidKind,
        /// kind encoded in the pid.
        got: PidKind,
    },
}
