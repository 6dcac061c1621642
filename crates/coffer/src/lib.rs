//! coffer library - the secret management services.
//!
//! every public operation on [`Coffer`] runs inside one
//! [`coffer_db::UnitOfWork`]: it resolves the caller, checks the permission
//! graph through [`coffer_grants`], and only then touches secret material.
//! - [`credentials`]: create, read, edit and delete secrets
//! - [`vaults`]: containers for credentials
//! - [`groups`]: named sets of users that can hold permissions
//! - [`users`]: registration and personal vaults
//! - [`authz`]: grant, edit and revoke permission assignments
//! - [`cipher`]: field-level encryption of secret bytes

#![warn(missing_docs)]

mod access;
pub mod authz;
pub mod cipher;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod groups;
pub mod resolver;
pub mod users;
pub mod vaults;

use std::sync::Arc;

use coffer_db::CofferDb;
use coffer_types::{Config, Pid, PidKind};

pub use authz::{GrantRequest, KeyShare};
pub use cipher::SecretCipher;
pub use credentials::{CredentialUpdate, CredentialView, NewCredential, PasswordUpdate};
pub use error::{Error, GenericResponse, Result};
pub use groups::{GroupMember, GroupUpdate, NewGroup};
pub use users::NewUser;
pub use vaults::{NewVault, VaultUpdate};

fn generate_assignment_pid() -> Pid {
    Pid::generate(PidKind::Assignment)
}

/// the coffer service: a database handle plus the process-wide cipher.
///
/// cheap to clone; clones share the connection pool and the key.
#[derive(Clone)]
pub struct Coffer {
    db: CofferDb,
    cipher: Arc<SecretCipher>,
    assignment_pid: fn() -> Pid,
}

impl Coffer {
    /// create a service over an open database.
    pub fn new(db: CofferDb, cipher: SecretCipher) -> Self {
        Self {
            db,
            cipher: Arc::new(cipher),
            assignment_pid: generate_assignment_pid,
        }
    }

    /// load the key, connect to the database and run migrations.
    ///
    /// a key that cannot be loaded is fatal: no service is built without one.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cipher = SecretCipher::load(&config.secrets)?;
        let db = CofferDb::new(config).await?;
        Ok(Self::new(db, cipher))
    }

    /// the underlying database.
    pub fn db(&self) -> &CofferDb {
        &self.db
    }

    /// the process-wide cipher.
    pub fn cipher(&self) -> &SecretCipher {
        &self.cipher
    }

    #[cfg(test)]
    pub(crate) fn with_assignment_pids(mut self, generate: fn() -> Pid) -> Self {
        self.assignment_pid = generate;
        self
    }
}
