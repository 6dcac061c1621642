//! stored payload rows, as the database sees them.
//!
//! secret fields here are ciphertext (`nonce || ct`); decryption happens in
//! the service layer, never in this crate.

use chrono::{DateTime, Utc};

use coffer_types::FeatureFlag;

/// encrypted totp seed and its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TotpRecord {
    /// encrypted seed.
    pub secret: Vec<u8>,
    /// code length.
    pub length: u8,
    /// code period in seconds.
    pub period: u32,
}

/// a row of `password_credentials`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordRecord {
    /// database id (0 before insert).
    pub id: u64,
    /// login name, in clear.
    pub username: String,
    /// encrypted password.
    pub password: Vec<u8>,
    /// strength score.
    pub strength: i32,
    /// rotation deadline.
    pub expires_at: Option<DateTime<Utc>>,
    /// optional encrypted totp seed.
    pub totp: Option<TotpRecord>,
}

/// a row of `file_credentials`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// database id (0 before insert).
    pub id: u64,
    /// key of the encrypted contents in the blob store.
    pub blob_key: String,
    /// original file name.
    pub file_name: String,
    /// rotation deadline.
    pub expires_at: Option<DateTime<Utc>>,
}

/// a row of `feature_flag_credentials` with its flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagSetRecord {
    /// database id (0 before insert).
    pub id: u64,
    /// set name.
    pub name: String,
    /// environment.
    pub environment: String,
    /// flags, ordered by insertion.
    pub flags: Vec<FeatureFlag>,
}

/// row counts found by [`crate::UnitOfWork::integrity_report`].
///
/// every field is zero on a consistent store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// payload rows no credential envelope points at.
    pub orphaned_payloads: u64,
    /// envelopes whose payload row is missing.
    pub dangling_envelopes: u64,
    /// flag rows whose set is missing.
    pub orphaned_flags: u64,
    /// vault links whose vault or credential is missing.
    pub dangling_vault_links: u64,
    /// assignments whose resource or identity is missing.
    pub dangling_assignments: u64,
    /// blobs no file payload row points at.
    pub orphaned_blobs: u64,
}

impl IntegrityReport {
    /// whether every count is zero.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "orphaned payloads:    {}", self.orphaned_payloads)?;
        writeln!(f, "dangling envelopes:   {}", self.dangling_envelopes)?;
        writeln!(f, "orphaned flags:       {}", self.orphaned_flags)?;
        writeln!(f, "dangling vault links: {}", self.dangling_vault_links)?;
        writeln!(f, "dangling assignments: {}", self.dangling_assignments)?;
        write!(f, "orphaned blobs:       {}", self.orphaned_blobs)
    }
}
