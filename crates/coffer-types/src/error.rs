//! error types for coffer-types

use thiserror::Error;

use crate::PidError;

/// errors that can occur in coffer-types
#[derive(Debug, Error)]
pub enum Error {
    /// pid failed validation
    #[error("invalid pid: {0}")]
    InvalidPid(#[from] PidError),

    /// permission name is not one of view, edit, admin, owner
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// resource type tag is not vault, credential or group
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// identity type tag is not user or group
    #[error("unknown identity type: {0}")]
    UnknownIdentityType(String),

    /// credential kind tag is not password, file or feature_flags
    #[error("unknown credential kind: {0}")]
    UnknownCredentialKind(String),

    /// action name is not create, read, update or delete
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
