//! vaults: named containers of credentials.

use tracing::info;

use coffer_db::UnitOfWork;
use coffer_types::{Action, Credential, Pid, Principal, Resource, Vault};

use crate::error::{Error, Result};
use crate::Coffer;

/// a vault to create.
#[derive(Debug, Clone, Default)]
pub struct NewVault {
    /// display name.
    pub name: String,
    /// free text.
    pub description: String,
    /// public key members encrypt shares with.
    pub public_key: Vec<u8>,
}

impl NewVault {
    /// a vault with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// changes to a vault. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct VaultUpdate {
    /// new name.
    pub name: Option<String>,
    /// new description.
    pub description: Option<String>,
    /// new public key.
    pub public_key: Option<Vec<u8>>,
}

/// resolve a vault pid, `NotFound` if it names nothing.
pub(crate) async fn find_vault(uow: &UnitOfWork, pid: &Pid) -> Result<Vault> {
    uow.get_vault_by_pid(pid)
        .await?
        .ok_or_else(|| Error::not_found(format!("vault {pid}")))
}

impl Coffer {
    /// create a vault owned by the caller.
    pub async fn create_vault(&self, principal: &Principal, new: NewVault) -> Result<Vault> {
        let uow = self.db.begin().await?;
        let result = self.create_vault_in(&uow, principal, new).await;
        uow.finish(result).await
    }

    async fn create_vault_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        new: NewVault,
    ) -> Result<Vault> {
        let user = self.caller(uow, principal).await?;
        if new.name.trim().is_empty() {
            return Err(Error::Validation("vault name must not be empty".to_string()));
        }

        let mut vault = Vault::new(new.name, new.description);
        vault.public_key = new.public_key;
        let vault = uow.create_vault(&vault).await?;
        self.assign_owner(uow, &user, Resource::Vault(vault.id), &vault.pid)
            .await?;

        info!(vault = %vault.pid, owner = %user.pid, "created vault");
        Ok(vault)
    }

    /// a vault the caller may read.
    pub async fn get_vault(&self, principal: &Principal, pid: &Pid) -> Result<Vault> {
        let uow = self.db.begin().await?;
        let result = self.get_vault_in(&uow, principal, pid).await;
        uow.finish(result).await
    }

    async fn get_vault_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        pid: &Pid,
    ) -> Result<Vault> {
        let user = self.caller(uow, principal).await?;
        let vault = find_vault(uow, pid).await?;
        self.require(uow, &user, Resource::Vault(vault.id), Action::Read)
            .await?;
        Ok(vault)
    }

    /// change a vault's name, description or public key.
    pub async fn edit_vault(
        &self,
        principal: &Principal,
        pid: &Pid,
        update: VaultUpdate,
    ) -> Result<Vault> {
        let uow = self.db.begin().await?;
        let result = self.edit_vault_in(&uow, principal, pid, update).await;
        uow.finish(result).await
    }

    async fn edit_vault_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        pid: &Pid,
        update: VaultUpdate,
    ) -> Result<Vault> {
        let user = self.caller(uow, principal).await?;
        let mut vault = find_vault(uow, pid).await?;
        self.require(uow, &user, Resource::Vault(vault.id), Action::Update)
            .await?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(Error::Validation("vault name must not be empty".to_string()));
            }
            vault.name = name;
        }
        if let Some(description) = update.description {
            vault.description = description;
        }
        if let Some(public_key) = update.public_key {
            vault.public_key = public_key;
        }

        let vault = uow.update_vault(&vault).await?;
        info!(vault = %vault.pid, by = %user.pid, "edited vault");
        Ok(vault)
    }

    /// delete a vault and what only it holds.
    ///
    /// credentials held by no other vault are deleted with their payloads;
    /// credentials also held elsewhere are only unlinked. personal vaults
    /// cannot be deleted.
    pub async fn delete_vault(&self, principal: &Principal, pid: &Pid) -> Result<()> {
        let uow = self.db.begin().await?;
        let result = self.delete_vault_in(&uow, principal, pid).await;
        uow.finish(result).await
    }

    async fn delete_vault_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        pid: &Pid,
    ) -> Result<()> {
        let user = self.caller(uow, principal).await?;
        let vault = find_vault(uow, pid).await?;
        self.require(uow, &user, Resource::Vault(vault.id), Action::Delete)
            .await?;
        if vault.is_personal {
            return Err(Error::Validation(
                "a personal vault cannot be deleted".to_string(),
            ));
        }

        let mut deleted = 0usize;
        for credential in uow.credentials_in_vault(vault.id).await? {
            let holders = uow.vaults_for_credential(credential.id).await?;
            if holders.iter().all(|&holder| holder == vault.id) {
                uow.delete_credential(&credential).await?;
                deleted += 1;
            } else {
                uow.unlink_credential(vault.id, credential.id).await?;
            }
        }

        uow.delete_assignments_on(Resource::Vault(vault.id)).await?;
        uow.delete_vault_row(vault.id).await?;

        info!(vault = %vault.pid, by = %user.pid, credentials = deleted, "deleted vault");
        Ok(())
    }

    /// the credentials inside a vault the caller may read. envelopes only.
    pub async fn list_vault_credentials(
        &self,
        principal: &Principal,
        pid: &Pid,
    ) -> Result<Vec<Credential>> {
        let uow = self.db.begin().await?;
        let result = self.list_vault_credentials_in(&uow, principal, pid).await;
        uow.finish(result).await
    }

    async fn list_vault_credentials_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        pid: &Pid,
    ) -> Result<Vec<Credential>> {
        let user = self.caller(uow, principal).await?;
        let vault = find_vault(uow, pid).await?;
        self.require(uow, &user, Resource::Vault(vault.id), Action::Read)
            .await?;
        Ok(uow.credentials_in_vault(vault.id).await?)
    }
}
