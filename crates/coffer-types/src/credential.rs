//! credential envelopes and their typed payloads.
//!
//! the envelope never carries secret bytes. it points at exactly one
//! payload row whose shape depends on [`CredentialKind`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CredentialId, Error, Pid, PidKind};

/// allowed totp code lengths.
pub const TOTP_LENGTHS: RangeInclusive<u8> = 6..=8;

/// the closed set of credential variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// username/password with optional totp seed.
    Password,
    /// an encrypted file in the blob store.
    File,
    /// a named set of feature flags.
    FeatureFlags,
}

impl CredentialKind {
    /// stored tag.
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Password => "password",
            CredentialKind::File => "file",
            CredentialKind::FeatureFlags => "feature_flags",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(CredentialKind::Password),
            "file" => Ok(CredentialKind::File),
            "feature_flags" => Ok(CredentialKind::FeatureFlags),
            other => Err(Error::UnknownCredentialKind(other.to_string())),
        }
    }
}

/// the type-agnostic credential row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// internal key.
    pub id: CredentialId,

    /// public identifier.
    pub pid: Pid,

    /// display name.
    pub name: String,

    /// free-form notes.
    #[serde(default)]
    pub notes: String,

    /// which payload table `payload_id` points into.
    pub kind: CredentialKind,

    /// key of the payload row.
    pub payload_id: u64,

    /// when the credential was created.
    pub created_at: DateTime<Utc>,

    /// when the credential was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// create a new, unsaved envelope for an already written payload row.
    pub fn new(name: String, notes: String, kind: CredentialKind, payload_id: u64) -> Self {
        let now = Utc::now();
        Self {
            id: CredentialId(0),
            pid: Pid::generate(PidKind::Credential),
            name,
            notes,
            kind,
            payload_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// a time-based one-time password seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totp {
    /// the seed. encrypted at rest.
    pub secret: String,
    /// number of digits in a code.
    pub length: u8,
    /// code period in seconds.
    pub period: u32,
}

impl Totp {
    /// whether the length and period are usable.
    pub fn is_valid(&self) -> bool {
        TOTP_LENGTHS.contains(&self.length) && self.period > 0
    }
}

/// a decrypted password payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordSecret {
    /// login name. stored in clear.
    pub username: String,
    /// the password. encrypted at rest.
    pub password: String,
    /// client-computed strength score.
    #[serde(default)]
    pub strength: i32,
    /// when the password should be rotated.
    pub expires_at: Option<DateTime<Utc>>,
    /// optional totp seed.
    pub totp: Option<Totp>,
}

/// a decrypted file payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSecret {
    /// original file name.
    pub file_name: String,
    /// file contents. encrypted at rest in the blob store.
    pub contents: Vec<u8>,
    /// when the file should be rotated.
    pub expires_at: Option<DateTime<Utc>>,
}

/// one flag of a feature-flag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    /// display name of the flag.
    pub name: String,
    /// lookup key, unique within the set.
    pub key: String,
    /// the value.
    pub value: String,
}

impl FeatureFlag {
    /// a flag whose display name is its key.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            value: value.into(),
        }
    }
}

/// a feature-flag set payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlagSet {
    /// name of the set.
    pub name: String,
    /// environment the set applies to (e.g. "prod").
    pub environment: String,
    /// the flags, in insertion order.
    #[serde(default)]
    pub flags: Vec<FeatureFlag>,
}

impl FeatureFlagSet {
    /// value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// a typed payload, one variant per [`CredentialKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialPayload {
    /// a password.
    Password(PasswordSecret),
    /// a file.
    File(FileSecret),
    /// a feature-flag set.
    FeatureFlags(FeatureFlagSet),
}

impl CredentialPayload {
    /// the kind tag this payload is stored under.
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialPayload::Password(_) => CredentialKind::Password,
            CredentialPayload::File(_) => CredentialKind::File,
            CredentialPayload::FeatureFlags(_) => CredentialKind::FeatureFlags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        for kind in [
            CredentialKind::Password,
            CredentialKind::File,
            CredentialKind::FeatureFlags,
        ] {
            assert_eq!(kind.as_str().parse::<CredentialKind>().unwrap(), kind);
        }
        assert!("featureflags".parse::<CredentialKind>().is_err());
    }

    #[test]
    fn test_totp_validity() {
        let mut totp = Totp {
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            length: 6,
            period: 30,
        };
        assert!(totp.is_valid());

        totp.length = 9;
        assert!(!totp.is_valid());

        totp.length = 8;
        totp.period = 0;
        assert!(!totp.is_valid());
    }

    #[test]
    fn test_flag_lookup() {
        let set = FeatureFlagSet {
            name: "web".to_string(),
            environment: "prod".to_string(),
            flags: vec![FeatureFlag::new("env", "prod")],
        };
        assert_eq!(set.get("env"), Some("prod"));
        assert_eq!(set.get("region"), None);
    }

    #[test]
    fn test_payload_kind() {
        let payload = CredentialPayload::File(FileSecret {
            file_name: "id_ed25519".to_string(),
            contents: vec![1, 2, 3],
            expires_at: None,
        });
        assert_eq!(payload.kind(), CredentialKind::File);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "file");
    }
}
