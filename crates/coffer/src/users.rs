//! user registration and personal vaults.

use tracing::info;

use coffer_db::UnitOfWork;
use coffer_types::{Pid, Principal, Resource, User, Vault};

use crate::error::{Error, Result};
use crate::Coffer;

/// a user to register.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// unique login name.
    pub name: String,
    /// contact address.
    pub email: Option<String>,
    /// public key others encrypt shares for this user with.
    pub public_key: Vec<u8>,
}

impl NewUser {
    /// a user with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Coffer {
    /// register a user together with their personal vault.
    ///
    /// called by signup once an account is verified. the user is made owner
    /// of the personal vault in the same unit of work.
    pub async fn register_user(&self, new: NewUser) -> Result<User> {
        let uow = self.db.begin().await?;
        let result = self.register_user_in(&uow, new).await;
        uow.finish(result).await
    }

    async fn register_user_in(&self, uow: &UnitOfWork, new: NewUser) -> Result<User> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("user name must not be empty".to_string()));
        }
        if uow.get_user_by_name(name).await?.is_some() {
            return Err(Error::Validation(format!("user '{name}' already exists")));
        }

        let mut user = User::new(name.to_string());
        user.email = new.email;
        user.public_key = new.public_key;
        let user = uow.create_user(&user).await?;

        let mut vault = Vault::personal(user.id, &user.name);
        vault.public_key = user.public_key.clone();
        let vault = uow.create_vault(&vault).await?;
        self.assign_owner(uow, &user, Resource::Vault(vault.id), &vault.pid)
            .await?;

        info!(user = %user.pid, vault = %vault.pid, "registered user");
        Ok(user)
    }

    /// look up a user by pid, e.g. to fetch their public key before sharing.
    pub async fn get_user(&self, pid: &Pid) -> Result<User> {
        let uow = self.db.begin().await?;
        let result = uow
            .get_user_by_pid(pid)
            .await
            .map_err(Error::from)
            .and_then(|user| user.ok_or_else(|| Error::not_found(format!("user {pid}"))));
        uow.finish(result).await
    }

    /// the caller's personal vault.
    pub async fn personal_vault(&self, principal: &Principal) -> Result<Vault> {
        let uow = self.db.begin().await?;
        let result = self.personal_vault_in(&uow, principal).await;
        uow.finish(result).await
    }

    async fn personal_vault_in(&self, uow: &UnitOfWork, principal: &Principal) -> Result<Vault> {
        let user = self.caller(uow, principal).await?;
        uow.personal_vault_for(user.id)
            .await?
            .ok_or_else(|| Error::not_found(format!("personal vault of {}", user.pid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::service;
    use coffer_types::{Identity, Permission, PidKind};

    #[tokio::test]
    async fn test_register_creates_owned_personal_vault() {
        let (coffer, alice) = service().await;

        let vault = coffer.personal_vault(&alice).await.unwrap();
        assert!(vault.is_personal);
        assert_eq!(vault.name, "alice's vault");

        let uow = coffer.db().begin().await.unwrap();
        let user = uow.get_user_by_pid(&alice.user_pid).await.unwrap().unwrap();
        assert_eq!(vault.personal_owner, Some(user.id));
        let level = uow
            .direct_permission(Identity::User(user.id), Resource::Vault(vault.id))
            .await
            .unwrap();
        uow.commit().await.unwrap();
        assert_eq!(level, Some(Permission::Owner));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blank_names() {
        let (coffer, _alice) = service().await;

        let err = coffer.register_user(NewUser::new("alice")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = coffer.register_user(NewUser::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_user_carries_public_key() {
        let (coffer, _alice) = service().await;
        let new = NewUser {
            name: "bob".to_string(),
            email: Some("bob@example.com".to_string()),
            public_key: vec![1, 2, 3],
        };
        let bob = coffer.register_user(new).await.unwrap();

        let found = coffer.get_user(&bob.pid).await.unwrap();
        assert_eq!(found.public_key, vec![1, 2, 3]);
        assert_eq!(found.email.as_deref(), Some("bob@example.com"));

        let missing = Pid::generate(PidKind::User);
        assert!(matches!(
            coffer.get_user(&missing).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_personal_vault_of_unknown_caller_is_denied() {
        let (coffer, _alice) = service().await;
        let stranger = Principal::user(Pid::generate(PidKind::User));
        assert!(matches!(
            coffer.personal_vault(&stranger).await,
            Err(Error::NotAuthorized)
        ));
    }
}
