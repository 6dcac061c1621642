//! shared test utilities for coffer integration tests

#![allow(dead_code)] // not every test file uses every helper

use std::sync::Arc;

use coffer::{Coffer, NewCredential, NewUser, NewVault, SecretCipher};
use coffer_db::{CofferDb, IntegrityReport, MemoryBlobStore};
use coffer_types::{
    Action, Credential, CredentialPayload, FeatureFlag, FeatureFlagSet, PasswordSecret, Pid,
    Principal, ResourceType, Vault,
};

/// key used by every fixture.
pub const TEST_KEY: [u8; 32] = [0x5a; 32];

/// a service over in-memory sqlite and an in-memory blob store.
pub struct Fixture {
    pub coffer: Coffer,
    pub blobs: Arc<MemoryBlobStore>,
}

impl Fixture {
    pub async fn new() -> Self {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = CofferDb::new_in_memory_with_blobs(blobs.clone())
            .await
            .expect("failed to create in-memory database");
        Self {
            coffer: Coffer::new(db, SecretCipher::new(TEST_KEY)),
            blobs,
        }
    }

    /// register a user and return a principal for them
    pub async fn user(&self, name: &str) -> Principal {
        let user = self
            .coffer
            .register_user(NewUser::new(name))
            .await
            .expect("failed to register user");
        Principal::user(user.pid)
    }

    /// create a shared vault owned by `owner`
    pub async fn vault(&self, owner: &Principal, name: &str) -> Vault {
        self.coffer
            .create_vault(owner, NewVault::new(name))
            .await
            .expect("failed to create vault")
    }

    /// create a password credential, optionally inside a vault
    pub async fn password(
        &self,
        owner: &Principal,
        name: &str,
        secret: &str,
        vault: Option<&Pid>,
    ) -> Credential {
        let mut new = NewCredential::new(name, password(secret));
        if let Some(vault) = vault {
            new = new.in_vault(vault.clone());
        }
        self.coffer
            .create_credential(owner, new)
            .await
            .expect("failed to create credential")
    }

    /// whether `who` may perform `action`
    pub async fn allowed(
        &self,
        who: &Principal,
        resource_type: ResourceType,
        pid: &Pid,
        action: Action,
    ) -> bool {
        self.coffer
            .authorize(who, resource_type, pid, action)
            .await
            .expect("authorize should not fail")
    }

    /// the actions `who` may perform, in [`Action::ALL`] order
    pub async fn actions(
        &self,
        who: &Principal,
        resource_type: ResourceType,
        pid: &Pid,
    ) -> Vec<Action> {
        let mut allowed = Vec::new();
        for action in Action::ALL {
            if self.allowed(who, resource_type, pid, action).await {
                allowed.push(action);
            }
        }
        allowed
    }

    /// integrity counters over the whole store
    pub async fn report(&self) -> IntegrityReport {
        let uow = self.coffer.db().begin().await.unwrap();
        let report = uow.integrity_report().await.unwrap();
        uow.commit().await.unwrap();
        report
    }
}

pub fn password(secret: &str) -> CredentialPayload {
    CredentialPayload::Password(PasswordSecret {
        username: "deploy".to_string(),
        password: secret.to_string(),
        strength: 3,
        expires_at: None,
        totp: None,
    })
}

pub fn flag_set(environment: &str, flags: &[(&str, &str)]) -> CredentialPayload {
    CredentialPayload::FeatureFlags(FeatureFlagSet {
        name: "service flags".to_string(),
        environment: environment.to_string(),
        flags: flags
            .iter()
            .map(|(key, value)| FeatureFlag::new(*key, *value))
            .collect(),
    })
}
