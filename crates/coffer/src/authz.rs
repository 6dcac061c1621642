//! the authorization workflow: grant, edit and revoke assignments.
//!
//! every mutation first checks the caller's own authority on the resource:
//! update to grant or edit, delete to revoke. a grant batch is one unit of
//! work; the first failing tuple or key-share deposit undoes the batch.

use tracing::info;

use coffer_db::UnitOfWork;
use coffer_types::{
    Action, CredentialPayload, FileSecret, Identity, IdentityType, Permission,
    PermissionAssignment, Pid, Principal, ResourceType, User,
};

use crate::access::find_resource;
use crate::credentials::NewCredential;
use crate::error::{Error, Result};
use crate::Coffer;

/// notes attached to deposited key shares.
const KEY_SHARE_NOTES: &str = "key share";

/// a secret share to deposit into a user's personal vault.
///
/// the bytes are stored as given; encrypting them for the recipient is the
/// caller's job.
#[derive(Debug, Clone)]
pub struct KeyShare {
    /// the user receiving the share.
    pub recipient: Pid,
    /// the share, already encrypted under the recipient's public key.
    pub share: Vec<u8>,
}

/// one tuple of a grant batch.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    /// kind of the resource.
    pub resource_type: ResourceType,
    /// the resource being shared.
    pub resource: Pid,
    /// kind of the identity.
    pub identity_type: IdentityType,
    /// who receives the permission.
    pub identity: Pid,
    /// the level granted.
    pub permission: Permission,
    /// shares to deposit alongside the assignment.
    pub key_shares: Vec<KeyShare>,
}

impl GrantRequest {
    /// a grant without key shares.
    pub fn new(
        resource_type: ResourceType,
        resource: Pid,
        identity_type: IdentityType,
        identity: Pid,
        permission: Permission,
    ) -> Self {
        Self {
            resource_type,
            resource,
            identity_type,
            identity,
            permission,
            key_shares: Vec::new(),
        }
    }

    /// deposit `share` for `recipient` when this tuple is granted.
    pub fn with_key_share(mut self, recipient: Pid, share: Vec<u8>) -> Self {
        self.key_shares.push(KeyShare { recipient, share });
        self
    }
}

async fn find_identity(
    uow: &UnitOfWork,
    identity_type: IdentityType,
    pid: &Pid,
) -> Result<Identity> {
    let identity = if pid.kind() != identity_type.pid_kind() {
        None
    } else {
        match identity_type {
            IdentityType::User => uow
                .get_user_by_pid(pid)
                .await?
                .map(|u| Identity::User(u.id)),
            IdentityType::Group => uow
                .get_group_by_pid(pid)
                .await?
                .map(|g| Identity::Group(g.id)),
        }
    };
    identity.ok_or_else(|| Error::not_found(format!("{identity_type} {pid}")))
}

async fn find_assignment(uow: &UnitOfWork, pid: &Pid) -> Result<PermissionAssignment> {
    uow.get_assignment_by_pid(pid)
        .await?
        .ok_or_else(|| Error::not_found(format!("permission {pid}")))
}

impl Coffer {
    /// grant a batch of permissions.
    ///
    /// for each tuple: resolve the resource, require update on it, resolve
    /// the identity, refuse a second edge for the same pair, write the
    /// assignment, then deposit its key shares.
    pub async fn grant_permissions(
        &self,
        principal: &Principal,
        requests: Vec<GrantRequest>,
    ) -> Result<Vec<PermissionAssignment>> {
        let uow = self.db.begin().await?;
        let result = self.grant_permissions_in(&uow, principal, requests).await;
        uow.finish(result).await
    }

    async fn grant_permissions_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        requests: Vec<GrantRequest>,
    ) -> Result<Vec<PermissionAssignment>> {
        let user = self.caller(uow, principal).await?;

        let mut granted = Vec::with_capacity(requests.len());
        for request in requests {
            let resource = find_resource(uow, request.resource_type, &request.resource).await?;
            self.require(uow, &user, resource, Action::Update).await?;

            let identity = find_identity(uow, request.identity_type, &request.identity).await?;
            if uow.find_assignment(identity, resource).await?.is_some() {
                return Err(Error::Validation(format!(
                    "{} {} already holds a permission on {} {}",
                    request.identity_type,
                    request.identity,
                    request.resource_type,
                    request.resource
                )));
            }

            let assignment = self
                .assign(
                    uow,
                    (identity, &request.identity),
                    (resource, &request.resource),
                    request.permission,
                )
                .await?;

            for share in request.key_shares {
                self.deposit_share(uow, &request.resource, share).await?;
            }

            info!(
                permission = %assignment.pid,
                resource = %assignment.resource_pid,
                identity = %assignment.identity_pid,
                level = %assignment.permission,
                by = %user.pid,
                "granted permission"
            );
            granted.push(assignment);
        }
        Ok(granted)
    }

    /// store a share as a file credential in the recipient's personal vault,
    /// named after the shared resource and owned by the recipient.
    async fn deposit_share(
        &self,
        uow: &UnitOfWork,
        resource_pid: &Pid,
        share: KeyShare,
    ) -> Result<()> {
        let recipient: User = uow
            .get_user_by_pid(&share.recipient)
            .await?
            .ok_or_else(|| Error::not_found(format!("user {}", share.recipient)))?;
        let vault = uow
            .personal_vault_for(recipient.id)
            .await?
            .ok_or_else(|| Error::not_found(format!("personal vault of {}", recipient.pid)))?;

        let payload = CredentialPayload::File(FileSecret {
            file_name: resource_pid.to_string(),
            contents: share.share,
            expires_at: None,
        });
        let new = NewCredential::new(resource_pid.as_str(), payload)
            .with_notes(KEY_SHARE_NOTES)
            .in_vault(vault.pid);
        let credential = self.create_credential_in(uow, &recipient, new).await?;

        info!(
            credential = %credential.pid,
            recipient = %recipient.pid,
            resource = %resource_pid,
            "deposited key share"
        );
        Ok(())
    }

    /// change the level of an assignment. `None` leaves it unchanged.
    ///
    /// the caller needs update on the assignment's resource.
    pub async fn edit_permission(
        &self,
        principal: &Principal,
        pid: &Pid,
        permission: Option<Permission>,
    ) -> Result<PermissionAssignment> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let assignment = find_assignment(&uow, pid).await?;
            self.require(&uow, &user, assignment.resource, Action::Update)
                .await?;

            let Some(permission) = permission else {
                return Ok(assignment);
            };
            let updated = uow
                .update_assignment_permission(&assignment, permission)
                .await?;
            info!(
                permission = %updated.pid,
                from = %assignment.permission,
                to = %updated.permission,
                by = %user.pid,
                "edited permission"
            );
            Ok(updated)
        }
        .await;
        uow.finish(result).await
    }

    /// delete an assignment. the caller needs delete on its resource.
    pub async fn revoke_permission(&self, principal: &Principal, pid: &Pid) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let assignment = find_assignment(&uow, pid).await?;
            self.require(&uow, &user, assignment.resource, Action::Delete)
                .await?;

            uow.delete_assignment(&assignment).await?;
            info!(
                permission = %assignment.pid,
                resource = %assignment.resource_pid,
                by = %user.pid,
                "revoked permission"
            );
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// every assignment on a resource. the caller needs update on it.
    pub async fn permissions_on_resource(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        pid: &Pid,
    ) -> Result<Vec<PermissionAssignment>> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let resource = find_resource(&uow, resource_type, pid).await?;
            self.require(&uow, &user, resource, Action::Update).await?;
            Ok(uow.assignments_on(resource).await?)
        }
        .await;
        uow.finish(result).await
    }

    /// the assignments the caller holds directly.
    pub async fn permissions_held(
        &self,
        principal: &Principal,
    ) -> Result<Vec<PermissionAssignment>> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            Ok(uow.assignments_held_by(Identity::User(user.id)).await?)
        }
        .await;
        uow.finish(result).await
    }
}
