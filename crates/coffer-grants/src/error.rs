//! error types for coffer-grants.

use thiserror::Error;

/// errors that can occur while resolving a permission.
///
/// any error means the check failed closed: callers must treat it as a
/// denial.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: std::error::Error + 'static,
{
    /// the assignment source failed to answer a lookup.
    #[error("assignment lookup failed: {0}")]
    Lookup(#[source] E),
}

impl<E> Error<E>
where
    E: std::error::Error + 'static,
{
    /// unwrap the source error.
    pub fn into_inner(self) -> E {
        match self {
            Error::Lookup(e) => e,
        }
    }
}

/// result type for coffer-grants operations.
pub type Result<T, E> = std::result::Result<T, Error<E>>;
