//! core types for coffer - a multi-tenant secret store.
//!
//! this crate provides the fundamental data structures used throughout coffer:
//! - [`Pid`]: validated public identifiers, the only ids callers ever see
//! - [`Permission`] and [`Action`]: privilege levels and what they allow
//! - [`Resource`] and [`Identity`]: the two ends of a [`PermissionAssignment`]
//! - [`Credential`] and [`CredentialPayload`]: secret envelopes and typed payloads
//! - [`Config`]: application configuration

mod assignment;
mod config;
mod credential;
mod error;
mod permission;
mod pid;
mod principal;
mod resource;
mod user;
mod vault;

pub use assignment::PermissionAssignment;
pub use config::{Config, DatabaseConfig, SecretsConfig, SqliteConfig, StorageConfig};
pub use credential::{
    Credential, CredentialKind, CredentialPayload, FeatureFlag, FeatureFlagSet, FileSecret,
    PasswordSecret, TOTP_LENGTHS, Totp,
};
pub use error::Error;
pub use permission::{Action, Permission};
pub use pid::{PID_HEX_LEN, Pid, PidError, PidKind};
pub use principal::{Principal, PrincipalKind};
pub use resource::{
    AssignmentId, CredentialId, GroupId, Identity, IdentityType, Resource, ResourceType, UserId,
    VaultId,
};
pub use user::{Group, User};
pub use vault::Vault;

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
