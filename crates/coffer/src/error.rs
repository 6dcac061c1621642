//! service errors and outcome codes.

use serde::Serialize;
use thiserror::Error;

/// errors returned by [`crate::Coffer`] operations.
#[derive(Debug, Error)]
pub enum Error {
    /// a pid did not resolve to a row.
    #[error("not found: {0}")]
    NotFound(String),

    /// the permission check denied the action, or could not complete.
    #[error("not authorized")]
    NotAuthorized,

    /// the request is malformed or conflicts with existing state.
    #[error("validation error: {0}")]
    Validation(String),

    /// the store failed. a store lookup that finds nothing becomes
    /// [`Error::NotFound`] instead.
    #[error("storage error: {0}")]
    Storage(#[source] coffer_db::Error),

    /// encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// the service could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// the http-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotAuthorized => 403,
            Error::NotFound(_) => 404,
            Error::Validation(_) => 400,
            Error::Storage(_) | Error::Crypto(_) | Error::Config(_) => 500,
        }
    }

    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }
}

impl From<coffer_db::Error> for Error {
    fn from(err: coffer_db::Error) -> Self {
        match err {
            coffer_db::Error::NotFound(what) => Error::NotFound(what),
            other => Error::Storage(other),
        }
    }
}

impl From<coffer_types::Error> for Error {
    fn from(err: coffer_types::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<coffer_types::PidError> for Error {
    fn from(err: coffer_types::PidError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// the outcome of an operation as handed to a transport layer.
///
/// `code` is 0 on success, otherwise [`Error::status_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericResponse {
    /// whether the operation succeeded.
    pub success: bool,
    /// a human readable outcome.
    pub message: String,
    /// 0 on success, otherwise an http status code.
    pub code: u16,
}

impl GenericResponse {
    /// a successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: 0,
        }
    }

    /// summarise a service result.
    pub fn from_result<T>(result: &Result<T>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                code: e.status_code(),
            },
        }
    }
}
