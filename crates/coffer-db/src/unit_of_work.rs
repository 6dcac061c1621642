//! the transaction boundary for every coffer operation.
//!
//! a [`UnitOfWork`] wraps one database transaction together with the blob
//! writes and blob retirements made under it. rows and blobs are committed
//! or rolled back together:
//!
//! - `commit` commits the transaction, then deletes retired blobs. if the
//!   commit fails it behaves like `rollback`
//! - `rollback` rolls the transaction back, then deletes blobs written here
//!
//! blob deletion is best effort; failures are logged and never undo a
//! database commit.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, warn};

use coffer_types::{
    Credential, CredentialId, CredentialKind, FeatureFlag, Group, GroupId, Identity,
    IdentityType, Permission, PermissionAssignment, Pid, Resource, ResourceType, User, UserId,
    Vault, VaultId,
};

use crate::blob::{BlobStore, generate_blob_key};
use crate::entity;
use crate::payload::{FileRecord, FlagSetRecord, IntegrityReport, PasswordRecord};
use crate::{Error, Result};

/// one database transaction plus its blob side effects.
///
/// every method takes `&self`, so a unit can be shared by reference across
/// the helpers of one operation.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    blobs: Arc<dyn BlobStore>,
    written: Mutex<Vec<String>>,
    retired: Mutex<Vec<String>>,
}

fn take(list: &Mutex<Vec<String>>) -> Vec<String> {
    let mut guard = list.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::take(&mut *guard)
}

fn snapshot(list: &Mutex<Vec<String>>) -> Vec<String> {
    list.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn push(list: &Mutex<Vec<String>>, key: String) {
    list.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(key);
}

/// best-effort blob cleanup; a failure is logged and skipped.
async fn delete_blobs(blobs: &dyn BlobStore, keys: Vec<String>, why: &str) {
    for key in keys {
        if let Err(e) = blobs.delete(&key).await {
            warn!(blob = %key, error = %e, "failed to delete blob {why}");
        }
    }
}

impl UnitOfWork {
    pub(crate) async fn begin(
        conn: &sea_orm::DatabaseConnection,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        let txn = conn.begin().await?;
        Ok(Self {
            txn,
            blobs,
            written: Mutex::new(Vec::new()),
            retired: Mutex::new(Vec::new()),
        })
    }

    /// commit the transaction, then delete blobs retired in this unit.
    ///
    /// if the commit itself fails the rows are gone, so the blobs written
    /// here are deleted as on rollback and retired blobs are kept.
    pub async fn commit(self) -> Result<()> {
        if let Err(e) = self.txn.commit().await {
            let written = take(&self.written);
            take(&self.retired);
            warn!(error = %e, written = written.len(), "unit of work failed to commit");
            delete_blobs(self.blobs.as_ref(), written, "written by failed commit").await;
            return Err(e.into());
        }

        // blobs written here are now owned by committed rows
        take(&self.written);
        let retired = take(&self.retired);
        debug!(retired = retired.len(), "unit of work committed");
        delete_blobs(self.blobs.as_ref(), retired, "retired").await;
        Ok(())
    }

    /// roll the transaction back, then delete blobs written in this unit.
    pub async fn rollback(self) -> Result<()> {
        let written = take(&self.written);
        // retired blobs stay: the rows pointing at them survive
        take(&self.retired);

        let result = self.txn.rollback().await;
        debug!(written = written.len(), "unit of work rolled back");

        delete_blobs(self.blobs.as_ref(), written, "written by rolled back unit").await;
        Ok(result?)
    }

    /// commit on `Ok`, roll back on `Err`, and pass the result through.
    ///
    /// a commit failure replaces the `Ok` value with the commit error. a
    /// rollback failure is logged; the original error is returned.
    pub async fn finish<T, E>(self, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    // ─── Blobs ──────────────────────────────────────────────────────────────

    /// write `data` under a fresh key. deleted again if this unit rolls back.
    pub async fn put_blob(&self, data: &[u8]) -> Result<String> {
        let key = generate_blob_key();
        self.blobs.put(&key, data).await?;
        push(&self.written, key.clone());
        Ok(key)
    }

    /// read a blob.
    pub async fn get_blob(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs.get(key).await
    }

    /// mark a blob for deletion once this unit commits.
    pub fn retire_blob(&self, key: String) {
        push(&self.retired, key);
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    /// insert a user. returns it with its assigned id.
    pub async fn create_user(&self, user: &User) -> Result<User> {
        let model: entity::user::ActiveModel = user.into();
        model.insert(&self.txn).await?.try_into()
    }

    /// get a user by internal id.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        entity::user::Entity::find_by_id(id.0 as i64)
            .one(&self.txn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// get a user by pid.
    pub async fn get_user_by_pid(&self, pid: &Pid) -> Result<Option<User>> {
        entity::user::Entity::find()
            .filter(entity::user::Column::Pid.eq(pid.as_str()))
            .one(&self.txn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// get a user by name.
    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        entity::user::Entity::find()
            .filter(entity::user::Column::Name.eq(name))
            .one(&self.txn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    // ─── Groups ─────────────────────────────────────────────────────────────

    /// insert a group. returns it with its assigned id.
    pub async fn create_group(&self, group: &Group) -> Result<Group> {
        let model: entity::group::ActiveModel = group.into();
        model.insert(&self.txn).await?.try_into()
    }

    /// get a group by internal id.
    pub async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        entity::group::Entity::find_by_id(id.0 as i64)
            .one(&self.txn)
            .await?
            .map(Group::try_from)
            .transpose()
    }

    /// get a group by pid.
    pub async fn get_group_by_pid(&self, pid: &Pid) -> Result<Option<Group>> {
        entity::group::Entity::find()
            .filter(entity::group::Column::Pid.eq(pid.as_str()))
            .one(&self.txn)
            .await?
            .map(Group::try_from)
            .transpose()
    }

    /// overwrite a group's mutable fields.
    pub async fn update_group(&self, group: &Group) -> Result<Group> {
        let mut model: entity::group::ActiveModel = group.into();
        model.updated_at = Set(Utc::now());
        model.update(&self.txn).await?.try_into()
    }

    /// delete the group row only. callers remove assignments first.
    pub async fn delete_group_row(&self, id: GroupId) -> Result<()> {
        entity::group::Entity::delete_by_id(id.0 as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    /// groups the user belongs to: any assignment of the user on a group.
    pub async fn group_memberships(&self, user: UserId) -> Result<Vec<GroupId>> {
        use entity::permission_assignment::Column;

        let ids: Vec<i64> = entity::permission_assignment::Entity::find()
            .select_only()
            .column(Column::ResourceId)
            .filter(Column::IdentityType.eq(IdentityType::User.as_str()))
            .filter(Column::IdentityId.eq(user.0 as i64))
            .filter(Column::ResourceType.eq(ResourceType::Group.as_str()))
            .into_tuple()
            .all(&self.txn)
            .await?;

        Ok(ids.into_iter().map(|id| GroupId(id as u64)).collect())
    }

    // ─── Vaults ─────────────────────────────────────────────────────────────

    /// insert a vault. returns it with its assigned id.
    pub async fn create_vault(&self, vault: &Vault) -> Result<Vault> {
        let model: entity::vault::ActiveModel = vault.into();
        model.insert(&self.txn).await?.try_into()
    }

    /// get a vault by internal id.
    pub async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>> {
        entity::vault::Entity::find_by_id(id.0 as i64)
            .one(&self.txn)
            .await?
            .map(Vault::try_from)
            .transpose()
    }

    /// get a vault by pid.
    pub async fn get_vault_by_pid(&self, pid: &Pid) -> Result<Option<Vault>> {
        entity::vault::Entity::find()
            .filter(entity::vault::Column::Pid.eq(pid.as_str()))
            .one(&self.txn)
            .await?
            .map(Vault::try_from)
            .transpose()
    }

    /// the personal vault of a user.
    pub async fn personal_vault_for(&self, user: UserId) -> Result<Option<Vault>> {
        entity::vault::Entity::find()
            .filter(entity::vault::Column::PersonalOwnerId.eq(user.0 as i64))
            .one(&self.txn)
            .await?
            .map(Vault::try_from)
            .transpose()
    }

    /// overwrite a vault's mutable fields.
    pub async fn update_vault(&self, vault: &Vault) -> Result<Vault> {
        let mut model: entity::vault::ActiveModel = vault.into();
        model.updated_at = Set(Utc::now());
        model.update(&self.txn).await?.try_into()
    }

    /// delete the vault row only. callers empty the vault first.
    pub async fn delete_vault_row(&self, id: VaultId) -> Result<()> {
        entity::vault::Entity::delete_by_id(id.0 as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    /// put a credential into a vault.
    pub async fn link_credential(&self, vault: VaultId, credential: CredentialId) -> Result<()> {
        let model = entity::vault_credential::ActiveModel {
            id: NotSet,
            vault_id: Set(vault.0 as i64),
            credential_id: Set(credential.0 as i64),
        };
        model.insert(&self.txn).await?;
        Ok(())
    }

    /// take a credential out of one vault.
    pub async fn unlink_credential(&self, vault: VaultId, credential: CredentialId) -> Result<()> {
        use entity::vault_credential::Column;

        entity::vault_credential::Entity::delete_many()
            .filter(Column::VaultId.eq(vault.0 as i64))
            .filter(Column::CredentialId.eq(credential.0 as i64))
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    /// vaults containing the credential.
    pub async fn vaults_for_credential(&self, credential: CredentialId) -> Result<Vec<VaultId>> {
        use entity::vault_credential::Column;

        let ids: Vec<i64> = entity::vault_credential::Entity::find()
            .select_only()
            .column(Column::VaultId)
            .filter(Column::CredentialId.eq(credential.0 as i64))
            .into_tuple()
            .all(&self.txn)
            .await?;

        Ok(ids.into_iter().map(|id| VaultId(id as u64)).collect())
    }

    /// credential envelopes inside a vault, oldest first.
    pub async fn credentials_in_vault(&self, vault: VaultId) -> Result<Vec<Credential>> {
        use entity::vault_credential::Column;

        let ids: Vec<i64> = entity::vault_credential::Entity::find()
            .select_only()
            .column(Column::CredentialId)
            .filter(Column::VaultId.eq(vault.0 as i64))
            .into_tuple()
            .all(&self.txn)
            .await?;

        entity::credential::Entity::find()
            .filter(entity::credential::Column::Id.is_in(ids))
            .order_by_asc(entity::credential::Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(Credential::try_from)
            .collect()
    }

    // ─── Credential envelopes ───────────────────────────────────────────────

    /// insert an envelope. returns it with its assigned id.
    pub async fn create_credential(&self, credential: &Credential) -> Result<Credential> {
        let model: entity::credential::ActiveModel = credential.into();
        model.insert(&self.txn).await?.try_into()
    }

    /// get an envelope by internal id.
    pub async fn get_credential(&self, id: CredentialId) -> Result<Option<Credential>> {
        entity::credential::Entity::find_by_id(id.0 as i64)
            .one(&self.txn)
            .await?
            .map(Credential::try_from)
            .transpose()
    }

    /// get an envelope by pid.
    pub async fn get_credential_by_pid(&self, pid: &Pid) -> Result<Option<Credential>> {
        entity::credential::Entity::find()
            .filter(entity::credential::Column::Pid.eq(pid.as_str()))
            .one(&self.txn)
            .await?
            .map(Credential::try_from)
            .transpose()
    }

    /// overwrite an envelope's name and notes.
    pub async fn update_credential(&self, credential: &Credential) -> Result<Credential> {
        let mut model: entity::credential::ActiveModel = credential.into();
        model.updated_at = Set(Utc::now());
        model.update(&self.txn).await?.try_into()
    }

    /// remove a credential and everything that depends on it.
    ///
    /// order: vault links, payload (flag rows before their set, file blob
    /// retired), assignments on the credential, envelope.
    pub async fn delete_credential(&self, credential: &Credential) -> Result<()> {
        entity::vault_credential::Entity::delete_many()
            .filter(entity::vault_credential::Column::CredentialId.eq(credential.id.0 as i64))
            .exec(&self.txn)
            .await?;

        match credential.kind {
            CredentialKind::Password => self.delete_password(credential.payload_id).await?,
            CredentialKind::File => self.delete_file(credential.payload_id).await?,
            CredentialKind::FeatureFlags => self.delete_flag_set(credential.payload_id).await?,
        }

        self.delete_assignments_on(Resource::Credential(credential.id))
            .await?;

        entity::credential::Entity::delete_by_id(credential.id.0 as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    // ─── Password payloads ──────────────────────────────────────────────────

    /// insert a password payload row.
    pub async fn create_password(&self, record: &PasswordRecord) -> Result<PasswordRecord> {
        let model: entity::password_credential::ActiveModel = record.into();
        Ok(model.insert(&self.txn).await?.into())
    }

    /// get a password payload row.
    pub async fn get_password(&self, id: u64) -> Result<Option<PasswordRecord>> {
        Ok(entity::password_credential::Entity::find_by_id(id as i64)
            .one(&self.txn)
            .await?
            .map(Into::into))
    }

    /// overwrite a password payload row.
    pub async fn update_password(&self, record: &PasswordRecord) -> Result<PasswordRecord> {
        let model: entity::password_credential::ActiveModel = record.into();
        Ok(model.update(&self.txn).await?.into())
    }

    async fn delete_password(&self, id: u64) -> Result<()> {
        entity::password_credential::Entity::delete_by_id(id as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    // ─── File payloads ──────────────────────────────────────────────────────

    /// insert a file payload row. the blob must already be written.
    pub async fn create_file(&self, record: &FileRecord) -> Result<FileRecord> {
        let model: entity::file_credential::ActiveModel = record.into();
        Ok(model.insert(&self.txn).await?.into())
    }

    /// get a file payload row.
    pub async fn get_file(&self, id: u64) -> Result<Option<FileRecord>> {
        Ok(entity::file_credential::Entity::find_by_id(id as i64)
            .one(&self.txn)
            .await?
            .map(Into::into))
    }

    /// overwrite a file payload row.
    pub async fn update_file(&self, record: &FileRecord) -> Result<FileRecord> {
        let model: entity::file_credential::ActiveModel = record.into();
        Ok(model.update(&self.txn).await?.into())
    }

    async fn delete_file(&self, id: u64) -> Result<()> {
        if let Some(record) = self.get_file(id).await? {
            self.retire_blob(record.blob_key);
        }
        entity::file_credential::Entity::delete_by_id(id as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    // ─── Feature flag payloads ──────────────────────────────────────────────

    /// insert a flag set and its flags.
    pub async fn create_flag_set(
        &self,
        name: &str,
        environment: &str,
        flags: &[FeatureFlag],
    ) -> Result<FlagSetRecord> {
        let model = entity::feature_flag_credential::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            environment: Set(environment.to_string()),
        };
        let set = model.insert(&self.txn).await?;
        self.add_flags(set.id as u64, flags).await?;

        Ok(FlagSetRecord {
            id: set.id as u64,
            name: set.name,
            environment: set.environment,
            flags: flags.to_vec(),
        })
    }

    /// get a flag set with all its flags.
    pub async fn get_flag_set(&self, id: u64) -> Result<Option<FlagSetRecord>> {
        let Some(set) = entity::feature_flag_credential::Entity::find_by_id(id as i64)
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };

        let flags = entity::feature_flag_data::Entity::find()
            .filter(entity::feature_flag_data::Column::FlagSetId.eq(set.id))
            .order_by_asc(entity::feature_flag_data::Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(FeatureFlag::from)
            .collect();

        Ok(Some(FlagSetRecord {
            id: set.id as u64,
            name: set.name,
            environment: set.environment,
            flags,
        }))
    }

    /// insert flags into a set. a duplicate key fails with `AlreadyExists`.
    pub async fn add_flags(&self, set_id: u64, flags: &[FeatureFlag]) -> Result<()> {
        for flag in flags {
            let model = entity::feature_flag_data::ActiveModel {
                id: NotSet,
                flag_set_id: Set(set_id as i64),
                name: Set(flag.name.clone()),
                key: Set(flag.key.clone()),
                value: Set(flag.value.clone()),
            };
            model.insert(&self.txn).await?;
        }
        Ok(())
    }

    async fn find_flag(
        &self,
        set_id: u64,
        key: &str,
    ) -> Result<Option<entity::feature_flag_data::Model>> {
        use entity::feature_flag_data::Column;

        Ok(entity::feature_flag_data::Entity::find()
            .filter(Column::FlagSetId.eq(set_id as i64))
            .filter(Column::Key.eq(key))
            .one(&self.txn)
            .await?)
    }

    /// get one flag of a set.
    pub async fn get_flag(&self, set_id: u64, key: &str) -> Result<Option<FeatureFlag>> {
        Ok(self.find_flag(set_id, key).await?.map(Into::into))
    }

    /// set the value of an existing flag. returns false if the key is absent.
    pub async fn set_flag_value(&self, set_id: u64, key: &str, value: &str) -> Result<bool> {
        let Some(model) = self.find_flag(set_id, key).await? else {
            return Ok(false);
        };
        let mut active: entity::feature_flag_data::ActiveModel = model.into();
        active.value = Set(value.to_string());
        active.update(&self.txn).await?;
        Ok(true)
    }

    /// remove one flag. returns false if the key is absent.
    pub async fn remove_flag(&self, set_id: u64, key: &str) -> Result<bool> {
        use entity::feature_flag_data::Column;

        let result = entity::feature_flag_data::Entity::delete_many()
            .filter(Column::FlagSetId.eq(set_id as i64))
            .filter(Column::Key.eq(key))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_flag_set(&self, id: u64) -> Result<()> {
        entity::feature_flag_data::Entity::delete_many()
            .filter(entity::feature_flag_data::Column::FlagSetId.eq(id as i64))
            .exec(&self.txn)
            .await?;
        entity::feature_flag_credential::Entity::delete_by_id(id as i64)
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    // ─── Permission assignments ─────────────────────────────────────────────

    /// insert an assignment. a second edge for the same pair, or a reused
    /// pid, fails with `AlreadyExists`.
    pub async fn create_assignment(
        &self,
        assignment: &PermissionAssignment,
    ) -> Result<PermissionAssignment> {
        let model: entity::permission_assignment::ActiveModel = assignment.into();
        model.insert(&self.txn).await?.try_into()
    }

    /// get an assignment by pid.
    pub async fn get_assignment_by_pid(&self, pid: &Pid) -> Result<Option<PermissionAssignment>> {
        entity::permission_assignment::Entity::find()
            .filter(entity::permission_assignment::Column::Pid.eq(pid.as_str()))
            .one(&self.txn)
            .await?
            .map(PermissionAssignment::try_from)
            .transpose()
    }

    /// the assignment of `identity` on `resource`, if any.
    pub async fn find_assignment(
        &self,
        identity: Identity,
        resource: Resource,
    ) -> Result<Option<PermissionAssignment>> {
        use entity::permission_assignment::Column;

        entity::permission_assignment::Entity::find()
            .filter(Column::IdentityType.eq(identity.identity_type().as_str()))
            .filter(Column::IdentityId.eq(identity.raw_id() as i64))
            .filter(Column::ResourceType.eq(resource.resource_type().as_str()))
            .filter(Column::ResourceId.eq(resource.raw_id() as i64))
            .one(&self.txn)
            .await?
            .map(PermissionAssignment::try_from)
            .transpose()
    }

    /// the level `identity` holds directly on `resource`, if any.
    pub async fn direct_permission(
        &self,
        identity: Identity,
        resource: Resource,
    ) -> Result<Option<Permission>> {
        Ok(self
            .find_assignment(identity, resource)
            .await?
            .map(|a| a.permission))
    }

    /// change the level of an assignment.
    pub async fn update_assignment_permission(
        &self,
        assignment: &PermissionAssignment,
        permission: Permission,
    ) -> Result<PermissionAssignment> {
        let model = entity::permission_assignment::ActiveModel {
            id: Set(assignment.id.0 as i64),
            permission: Set(permission.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        model.update(&self.txn).await?.try_into()
    }

    /// delete one assignment.
    pub async fn delete_assignment(&self, assignment: &PermissionAssignment) -> Result<()> {
        let result = entity::permission_assignment::Entity::delete_by_id(assignment.id.0 as i64)
            .exec(&self.txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::NotFound(format!("assignment {}", assignment.pid)));
        }
        Ok(())
    }

    /// every assignment on a resource, oldest first.
    pub async fn assignments_on(&self, resource: Resource) -> Result<Vec<PermissionAssignment>> {
        use entity::permission_assignment::Column;

        entity::permission_assignment::Entity::find()
            .filter(Column::ResourceType.eq(resource.resource_type().as_str()))
            .filter(Column::ResourceId.eq(resource.raw_id() as i64))
            .order_by_asc(Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(PermissionAssignment::try_from)
            .collect()
    }

    /// every assignment held by an identity, oldest first.
    pub async fn assignments_held_by(
        &self,
        identity: Identity,
    ) -> Result<Vec<PermissionAssignment>> {
        use entity::permission_assignment::Column;

        entity::permission_assignment::Entity::find()
            .filter(Column::IdentityType.eq(identity.identity_type().as_str()))
            .filter(Column::IdentityId.eq(identity.raw_id() as i64))
            .order_by_asc(Column::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(PermissionAssignment::try_from)
            .collect()
    }

    /// delete every assignment on a resource. returns how many were removed.
    pub async fn delete_assignments_on(&self, resource: Resource) -> Result<u64> {
        use entity::permission_assignment::Column;

        let result = entity::permission_assignment::Entity::delete_many()
            .filter(Column::ResourceType.eq(resource.resource_type().as_str()))
            .filter(Column::ResourceId.eq(resource.raw_id() as i64))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    /// delete every assignment held by an identity. returns how many were removed.
    pub async fn delete_assignments_held_by(&self, identity: Identity) -> Result<u64> {
        use entity::permission_assignment::Column;

        let result = entity::permission_assignment::Entity::delete_many()
            .filter(Column::IdentityType.eq(identity.identity_type().as_str()))
            .filter(Column::IdentityId.eq(identity.raw_id() as i64))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    // ─── Integrity ──────────────────────────────────────────────────────────

    async fn id_set<E: EntityTrait>(&self, column: E::Column) -> Result<HashSet<i64>> {
        let ids: Vec<i64> = E::find()
            .select_only()
            .column(column)
            .into_tuple()
            .all(&self.txn)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// count rows that no longer hang together.
    pub async fn integrity_report(&self) -> Result<IntegrityReport> {
        let users = self
            .id_set::<entity::user::Entity>(entity::user::Column::Id)
            .await?;
        let groups = self
            .id_set::<entity::group::Entity>(entity::group::Column::Id)
            .await?;
        let vaults = self
            .id_set::<entity::vault::Entity>(entity::vault::Column::Id)
            .await?;
        let credential_ids = self
            .id_set::<entity::credential::Entity>(entity::credential::Column::Id)
            .await?;
        let passwords = self
            .id_set::<entity::password_credential::Entity>(entity::password_credential::Column::Id)
            .await?;
        let files = self
            .id_set::<entity::file_credential::Entity>(entity::file_credential::Column::Id)
            .await?;
        let flag_sets = self
            .id_set::<entity::feature_flag_credential::Entity>(
                entity::feature_flag_credential::Column::Id,
            )
            .await?;

        let mut report = IntegrityReport::default();

        // envelopes -> payloads
        let envelopes: Vec<(String, i64)> = entity::credential::Entity::find()
            .select_only()
            .column(entity::credential::Column::Kind)
            .column(entity::credential::Column::PayloadId)
            .into_tuple()
            .all(&self.txn)
            .await?;

        let mut referenced: [HashSet<i64>; 3] = Default::default();
        for (kind, payload_id) in envelopes {
            let (slot, table) = match kind.parse::<CredentialKind>()? {
                CredentialKind::Password => (0, &passwords),
                CredentialKind::File => (1, &files),
                CredentialKind::FeatureFlags => (2, &flag_sets),
            };
            if !table.contains(&payload_id) {
                report.dangling_envelopes += 1;
            }
            referenced[slot].insert(payload_id);
        }
        for (slot, table) in [&passwords, &files, &flag_sets].into_iter().enumerate() {
            report.orphaned_payloads += table.difference(&referenced[slot]).count() as u64;
        }

        // flag rows -> sets
        let flag_owners: Vec<i64> = entity::feature_flag_data::Entity::find()
            .select_only()
            .column(entity::feature_flag_data::Column::FlagSetId)
            .into_tuple()
            .all(&self.txn)
            .await?;
        report.orphaned_flags = flag_owners
            .iter()
            .filter(|id| !flag_sets.contains(id))
            .count() as u64;

        // vault links -> vaults and credentials
        let links: Vec<(i64, i64)> = entity::vault_credential::Entity::find()
            .select_only()
            .column(entity::vault_credential::Column::VaultId)
            .column(entity::vault_credential::Column::CredentialId)
            .into_tuple()
            .all(&self.txn)
            .await?;
        report.dangling_vault_links = links
            .iter()
            .filter(|(v, c)| !vaults.contains(v) || !credential_ids.contains(c))
            .count() as u64;

        // assignments -> both ends
        let edges: Vec<(String, i64, String, i64)> = entity::permission_assignment::Entity::find()
            .select_only()
            .column(entity::permission_assignment::Column::IdentityType)
            .column(entity::permission_assignment::Column::IdentityId)
            .column(entity::permission_assignment::Column::ResourceType)
            .column(entity::permission_assignment::Column::ResourceId)
            .into_tuple()
            .all(&self.txn)
            .await?;
        for (identity_type, identity_id, resource_type, resource_id) in edges {
            let identity_exists = match identity_type.parse::<IdentityType>()? {
                IdentityType::User => users.contains(&identity_id),
                IdentityType::Group => groups.contains(&identity_id),
            };
            let resource_exists = match resource_type.parse::<ResourceType>()? {
                ResourceType::Vault => vaults.contains(&resource_id),
                ResourceType::Credential => credential_ids.contains(&resource_id),
                ResourceType::Group => groups.contains(&resource_id),
            };
            if !identity_exists || !resource_exists {
                report.dangling_assignments += 1;
            }
        }

        // blobs -> file payloads. blobs retired in this unit are still on
        // disk until commit and are not counted.
        let blob_keys: Vec<String> = entity::file_credential::Entity::find()
            .select_only()
            .column(entity::file_credential::Column::BlobKey)
            .into_tuple()
            .all(&self.txn)
            .await?;
        let mut live_blobs: HashSet<String> = blob_keys.into_iter().collect();
        live_blobs.extend(snapshot(&self.retired));
        report.orphaned_blobs = self
            .blobs
            .keys()
            .await?
            .iter()
            .filter(|key| !live_blobs.contains(*key))
            .count() as u64;

        Ok(report)
    }
}
