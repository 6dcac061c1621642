//! credentials: typed, encrypted secrets behind an envelope row.
//!
//! creating a credential writes, in one unit of work:
//! 1. the payload row, secret fields sealed (file bytes go to the blob store)
//! 2. the envelope with a fresh `cred_` pid
//! 3. an owner assignment for the creator
//! 4. the vault link, if a vault was named and the creator may update it
//!
//! a failure at any step rolls back every earlier one, blob included.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use coffer_db::{FileRecord, PasswordRecord, TotpRecord, UnitOfWork};
use coffer_types::{
    Action, Credential, CredentialKind, CredentialPayload, FeatureFlag, FeatureFlagSet,
    FileSecret, PasswordSecret, Pid, Principal, Resource, Totp, User,
};

use crate::error::{Error, Result};
use crate::vaults::find_vault;
use crate::Coffer;

/// a credential to create.
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// display name. must not be blank.
    pub name: String,
    /// free text.
    pub notes: String,
    /// the declared kind. the payload must match it.
    pub kind: CredentialKind,
    /// the secret.
    pub payload: Option<CredentialPayload>,
    /// vault to put the credential in.
    pub vault: Option<Pid>,
}

impl NewCredential {
    /// a credential whose kind is taken from its payload.
    pub fn new(name: impl Into<String>, payload: CredentialPayload) -> Self {
        Self {
            name: name.into(),
            notes: String::new(),
            kind: payload.kind(),
            payload: Some(payload),
            vault: None,
        }
    }

    /// put the credential in `vault`.
    pub fn in_vault(mut self, vault: Pid) -> Self {
        self.vault = Some(vault);
        self
    }

    /// attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// a credential as returned to an authorized reader, payload decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialView {
    /// the envelope.
    pub credential: Credential,
    /// the decrypted payload.
    pub payload: CredentialPayload,
}

/// changes to an envelope. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    /// new name.
    pub name: Option<String>,
    /// new notes.
    pub notes: Option<String>,
}

/// changes to a password payload. `None` leaves a field as it is; the
/// nested options of `expires_at` and `totp` clear the field with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct PasswordUpdate {
    /// new login name.
    pub username: Option<String>,
    /// new password.
    pub password: Option<String>,
    /// new strength score.
    pub strength: Option<i32>,
    /// new rotation deadline.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// new totp seed.
    pub totp: Option<Option<Totp>>,
}

fn validate(new: &NewCredential) -> Result<&CredentialPayload> {
    if new.name.trim().is_empty() {
        return Err(Error::Validation("credential name must not be empty".to_string()));
    }
    let Some(payload) = &new.payload else {
        return Err(Error::Validation(format!("missing {} payload", new.kind)));
    };
    if payload.kind() != new.kind {
        return Err(Error::Validation(format!(
            "{} credential carries a {} payload",
            new.kind,
            payload.kind()
        )));
    }

    match payload {
        CredentialPayload::Password(password) => validate_totp(password.totp.as_ref())?,
        CredentialPayload::File(file) => {
            if file.file_name.trim().is_empty() {
                return Err(Error::Validation("file name must not be empty".to_string()));
            }
        }
        CredentialPayload::FeatureFlags(set) => validate_flags(&set.flags, &HashSet::new())?,
    }
    Ok(payload)
}

fn validate_totp(totp: Option<&Totp>) -> Result<()> {
    match totp {
        Some(totp) if !totp.is_valid() => Err(Error::Validation(format!(
            "invalid totp: length {} period {}",
            totp.length, totp.period
        ))),
        _ => Ok(()),
    }
}

/// keys must be non-empty, unique in the batch and absent from `existing`.
fn validate_flags(flags: &[FeatureFlag], existing: &HashSet<String>) -> Result<()> {
    let mut seen = HashSet::new();
    for flag in flags {
        if flag.key.is_empty() {
            return Err(Error::Validation("feature flag key must not be empty".to_string()));
        }
        if existing.contains(&flag.key) || !seen.insert(flag.key.as_str()) {
            return Err(Error::Validation(format!(
                "feature flag '{}' already exists",
                flag.key
            )));
        }
    }
    Ok(())
}

/// resolve a credential pid, `NotFound` if it names nothing.
pub(crate) async fn find_credential(uow: &UnitOfWork, pid: &Pid) -> Result<Credential> {
    uow.get_credential_by_pid(pid)
        .await?
        .ok_or_else(|| Error::not_found(format!("credential {pid}")))
}

fn missing_payload(credential: &Credential) -> Error {
    Error::Storage(coffer_db::Error::InvalidData(format!(
        "{} payload of credential {} is missing",
        credential.kind, credential.pid
    )))
}

fn flag_set_id(credential: &Credential) -> Result<u64> {
    expect_kind(credential, CredentialKind::FeatureFlags)?;
    Ok(credential.payload_id)
}

fn expect_kind(credential: &Credential, kind: CredentialKind) -> Result<()> {
    if credential.kind != kind {
        return Err(Error::Validation(format!(
            "credential {} is a {} credential, not {}",
            credential.pid, credential.kind, kind
        )));
    }
    Ok(())
}

impl Coffer {
    /// resolve the caller and the credential, then check `action` on it.
    async fn authorized_credential(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        pid: &Pid,
        action: Action,
    ) -> Result<(User, Credential)> {
        let user = self.caller(uow, principal).await?;
        let credential = find_credential(uow, pid).await?;
        self.require(uow, &user, Resource::Credential(credential.id), action)
            .await?;
        Ok((user, credential))
    }

    /// create a credential owned by the caller.
    pub async fn create_credential(
        &self,
        principal: &Principal,
        new: NewCredential,
    ) -> Result<Credential> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            self.create_credential_in(&uow, &user, new).await
        }
        .await;
        uow.finish(result).await
    }

    /// the creation protocol inside an open unit. `owner` becomes the
    /// credential's owner and must be able to update the target vault.
    pub(crate) async fn create_credential_in(
        &self,
        uow: &UnitOfWork,
        owner: &User,
        new: NewCredential,
    ) -> Result<Credential> {
        let payload = validate(&new)?;
        let payload_id = self.store_payload(uow, payload).await?;

        let credential = Credential::new(new.name.clone(), new.notes.clone(), new.kind, payload_id);
        let credential = uow.create_credential(&credential).await?;

        self.assign_owner(uow, owner, Resource::Credential(credential.id), &credential.pid)
            .await?;

        if let Some(vault_pid) = &new.vault {
            let vault = find_vault(uow, vault_pid).await?;
            self.require(uow, owner, Resource::Vault(vault.id), Action::Update)
                .await?;
            uow.link_credential(vault.id, credential.id).await?;
        }

        info!(
            credential = %credential.pid,
            kind = %credential.kind,
            owner = %owner.pid,
            vault = ?new.vault.as_ref().map(Pid::as_str),
            "created credential"
        );
        Ok(credential)
    }

    async fn store_payload(&self, uow: &UnitOfWork, payload: &CredentialPayload) -> Result<u64> {
        let id = match payload {
            CredentialPayload::Password(password) => {
                let record = self.seal_password(password)?;
                uow.create_password(&record).await?.id
            }
            CredentialPayload::File(file) => {
                let blob_key = uow.put_blob(&self.cipher.encrypt(&file.contents)?).await?;
                let record = FileRecord {
                    id: 0,
                    blob_key,
                    file_name: file.file_name.clone(),
                    expires_at: file.expires_at,
                };
                uow.create_file(&record).await?.id
            }
            CredentialPayload::FeatureFlags(set) => {
                uow.create_flag_set(&set.name, &set.environment, &set.flags)
                    .await?
                    .id
            }
        };
        Ok(id)
    }

    fn seal_password(&self, password: &PasswordSecret) -> Result<PasswordRecord> {
        Ok(PasswordRecord {
            id: 0,
            username: password.username.clone(),
            password: self.cipher.encrypt_str(&password.password)?,
            strength: password.strength,
            expires_at: password.expires_at,
            totp: password
                .totp
                .as_ref()
                .map(|totp| self.seal_totp(totp))
                .transpose()?,
        })
    }

    fn seal_totp(&self, totp: &Totp) -> Result<TotpRecord> {
        Ok(TotpRecord {
            secret: self.cipher.encrypt_str(&totp.secret)?,
            length: totp.length,
            period: totp.period,
        })
    }

    async fn open_payload(
        &self,
        uow: &UnitOfWork,
        credential: &Credential,
    ) -> Result<CredentialPayload> {
        let payload = match credential.kind {
            CredentialKind::Password => {
                let record = uow
                    .get_password(credential.payload_id)
                    .await?
                    .ok_or_else(|| missing_payload(credential))?;
                let totp = match record.totp {
                    Some(totp) => Some(Totp {
                        secret: self.cipher.decrypt_string(&totp.secret)?,
                        length: totp.length,
                        period: totp.period,
                    }),
                    None => None,
                };
                CredentialPayload::Password(PasswordSecret {
                    username: record.username,
                    password: self.cipher.decrypt_string(&record.password)?,
                    strength: record.strength,
                    expires_at: record.expires_at,
                    totp,
                })
            }
            CredentialKind::File => {
                let record = uow
                    .get_file(credential.payload_id)
                    .await?
                    .ok_or_else(|| missing_payload(credential))?;
                let sealed = uow.get_blob(&record.blob_key).await?;
                CredentialPayload::File(FileSecret {
                    file_name: record.file_name,
                    contents: self.cipher.decrypt(&sealed)?,
                    expires_at: record.expires_at,
                })
            }
            CredentialKind::FeatureFlags => {
                let record = uow
                    .get_flag_set(credential.payload_id)
                    .await?
                    .ok_or_else(|| missing_payload(credential))?;
                CredentialPayload::FeatureFlags(FeatureFlagSet {
                    name: record.name,
                    environment: record.environment,
                    flags: record.flags,
                })
            }
        };
        Ok(payload)
    }

    /// a credential with its decrypted payload.
    ///
    /// `NotFound` when the pid does not resolve, `NotAuthorized` when the
    /// caller may not read it.
    pub async fn get_credential(&self, principal: &Principal, pid: &Pid) -> Result<CredentialView> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Read)
                .await?;
            let payload = self.open_payload(&uow, &credential).await?;
            debug!(credential = %credential.pid, reader = %user.pid, "read credential");
            Ok(CredentialView {
                credential,
                payload,
            })
        }
        .await;
        uow.finish(result).await
    }

    /// rename a credential or change its notes.
    pub async fn edit_credential(
        &self,
        principal: &Principal,
        pid: &Pid,
        update: CredentialUpdate,
    ) -> Result<Credential> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, mut credential) = self
                .authorized_credential(&uow, principal, pid, Action::Update)
                .await?;
            if let Some(name) = update.name {
                if name.trim().is_empty() {
                    return Err(Error::Validation(
                        "credential name must not be empty".to_string(),
                    ));
                }
                credential.name = name;
            }
            if let Some(notes) = update.notes {
                credential.notes = notes;
            }
            let credential = uow.update_credential(&credential).await?;
            info!(credential = %credential.pid, by = %user.pid, "edited credential");
            Ok(credential)
        }
        .await;
        uow.finish(result).await
    }

    /// change the fields of a password credential.
    pub async fn edit_password(
        &self,
        principal: &Principal,
        pid: &Pid,
        update: PasswordUpdate,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Update)
                .await?;
            expect_kind(&credential, CredentialKind::Password)?;

            let mut record = uow
                .get_password(credential.payload_id)
                .await?
                .ok_or_else(|| missing_payload(&credential))?;
            if let Some(username) = update.username {
                record.username = username;
            }
            if let Some(password) = update.password {
                record.password = self.cipher.encrypt_str(&password)?;
            }
            if let Some(strength) = update.strength {
                record.strength = strength;
            }
            if let Some(expires_at) = update.expires_at {
                record.expires_at = expires_at;
            }
            if let Some(totp) = update.totp {
                validate_totp(totp.as_ref())?;
                record.totp = totp.as_ref().map(|t| self.seal_totp(t)).transpose()?;
            }

            uow.update_password(&record).await?;
            info!(credential = %credential.pid, by = %user.pid, "edited password");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// replace the contents of a file credential.
    ///
    /// the new blob is written now; the old one is deleted once the unit
    /// commits.
    pub async fn edit_file(
        &self,
        principal: &Principal,
        pid: &Pid,
        file: FileSecret,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Update)
                .await?;
            expect_kind(&credential, CredentialKind::File)?;
            if file.file_name.trim().is_empty() {
                return Err(Error::Validation("file name must not be empty".to_string()));
            }

            let mut record = uow
                .get_file(credential.payload_id)
                .await?
                .ok_or_else(|| missing_payload(&credential))?;
            let new_key = uow.put_blob(&self.cipher.encrypt(&file.contents)?).await?;
            let old_key = std::mem::replace(&mut record.blob_key, new_key);
            record.file_name = file.file_name;
            record.expires_at = file.expires_at;

            uow.update_file(&record).await?;
            uow.retire_blob(old_key);
            info!(credential = %credential.pid, by = %user.pid, "replaced file");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// add flags to a feature-flag credential.
    ///
    /// a key that already exists fails the whole batch.
    pub async fn add_feature_flags(
        &self,
        principal: &Principal,
        pid: &Pid,
        flags: Vec<FeatureFlag>,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Update)
                .await?;
            let set_id = flag_set_id(&credential)?;

            let set = uow
                .get_flag_set(set_id)
                .await?
                .ok_or_else(|| missing_payload(&credential))?;
            let existing: HashSet<String> = set.flags.into_iter().map(|f| f.key).collect();
            validate_flags(&flags, &existing)?;

            uow.add_flags(set_id, &flags).await?;
            info!(
                credential = %credential.pid,
                by = %user.pid,
                added = flags.len(),
                "added feature flags"
            );
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// set the value of an existing flag. `NotFound` if the key is absent.
    pub async fn set_feature_flag_value(
        &self,
        principal: &Principal,
        pid: &Pid,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Update)
                .await?;
            let set_id = flag_set_id(&credential)?;

            if !uow.set_flag_value(set_id, key, value).await? {
                return Err(Error::not_found(format!("feature flag '{key}'")));
            }
            info!(credential = %credential.pid, by = %user.pid, key, "set feature flag");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// remove flags by key. every key must exist.
    pub async fn remove_feature_flags(
        &self,
        principal: &Principal,
        pid: &Pid,
        keys: &[String],
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Delete)
                .await?;
            let set_id = flag_set_id(&credential)?;

            for key in keys {
                if !uow.remove_flag(set_id, key).await? {
                    return Err(Error::not_found(format!("feature flag '{key}'")));
                }
            }
            info!(
                credential = %credential.pid,
                by = %user.pid,
                removed = keys.len(),
                "removed feature flags"
            );
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// the value of one flag. `NotFound` if the key is absent.
    pub async fn get_feature_flag_value(
        &self,
        principal: &Principal,
        pid: &Pid,
        key: &str,
    ) -> Result<String> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (_, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Read)
                .await?;
            let set_id = flag_set_id(&credential)?;

            uow.get_flag(set_id, key)
                .await?
                .map(|flag| flag.value)
                .ok_or_else(|| Error::not_found(format!("feature flag '{key}'")))
        }
        .await;
        uow.finish(result).await
    }

    /// delete a credential with its payload, vault links and assignments.
    pub async fn delete_credential(&self, principal: &Principal, pid: &Pid) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, pid, Action::Delete)
                .await?;
            uow.delete_credential(&credential).await?;
            info!(credential = %credential.pid, by = %user.pid, "deleted credential");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// put an existing credential into another vault.
    ///
    /// the caller needs update on both the credential and the vault.
    pub async fn add_credential_to_vault(
        &self,
        principal: &Principal,
        credential_pid: &Pid,
        vault_pid: &Pid,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let (user, credential) = self
                .authorized_credential(&uow, principal, credential_pid, Action::Update)
                .await?;
            let vault = find_vault(&uow, vault_pid).await?;
            self.require(&uow, &user, Resource::Vault(vault.id), Action::Update)
                .await?;

            if uow.vaults_for_credential(credential.id).await?.contains(&vault.id) {
                return Err(Error::Validation(format!(
                    "credential {} is already in vault {}",
                    credential.pid, vault.pid
                )));
            }
            uow.link_credential(vault.id, credential.id).await?;
            info!(
                credential = %credential.pid,
                vault = %vault.pid,
                by = %user.pid,
                "linked credential"
            );
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// take a credential out of a vault without deleting it.
    pub async fn remove_credential_from_vault(
        &self,
        principal: &Principal,
        credential_pid: &Pid,
        vault_pid: &Pid,
    ) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let credential = find_credential(&uow, credential_pid).await?;
            let vault = find_vault(&uow, vault_pid).await?;
            self.require(&uow, &user, Resource::Vault(vault.id), Action::Update)
                .await?;

            if !uow.vaults_for_credential(credential.id).await?.contains(&vault.id) {
                return Err(Error::not_found(format!(
                    "credential {} in vault {}",
                    credential.pid, vault.pid
                )));
            }
            uow.unlink_credential(vault.id, credential.id).await?;
            info!(
                credential = %credential.pid,
                vault = %vault.pid,
                by = %user.pid,
                "unlinked credential"
            );
            Ok(())
        }
        .await;
        uow.finish(result).await
    }
}
