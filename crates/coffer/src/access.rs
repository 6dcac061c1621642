//! caller resolution and permission guards shared by every service.

use tracing::{debug, warn};

use coffer_db::UnitOfWork;
use coffer_grants::AccessResolver;
use coffer_types::{
    Action, Identity, Permission, PermissionAssignment, Pid, Principal, Resource, ResourceType,
    User,
};

use crate::error::{Error, Result};
use crate::resolver::TxAssignments;
use crate::Coffer;

impl Coffer {
    /// whether the caller may perform `action` on a resource.
    ///
    /// the guard for collaborators. a caller or resource pid that does not
    /// resolve, and any lookup failure, answer `false`.
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        resource_pid: &Pid,
        action: Action,
    ) -> Result<bool> {
        let uow = self.db.begin().await?;
        let result = self
            .authorize_in(&uow, principal, resource_type, resource_pid, action)
            .await;
        uow.finish(result).await
    }

    async fn authorize_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        resource_type: ResourceType,
        resource_pid: &Pid,
        action: Action,
    ) -> Result<bool> {
        let Some(user) = uow.get_user_by_pid(&principal.user_pid).await? else {
            debug!(caller = %principal.user_pid, "unknown caller");
            return Ok(false);
        };
        let Some(resource) = resolve_resource(uow, resource_type, resource_pid).await? else {
            debug!(resource = %resource_pid, "unknown resource");
            return Ok(false);
        };

        Ok(AccessResolver::new(TxAssignments::new(uow))
            .is_allowed(user.id, resource, action)
            .await)
    }

    /// whether a group, through its own assignments, may perform `action`
    /// on a resource. members' personal grants do not count.
    ///
    /// the caller must be able to read the group. like [`Self::authorize`],
    /// anything that does not resolve answers `false`.
    pub async fn authorize_group(
        &self,
        principal: &Principal,
        group_pid: &Pid,
        resource_type: ResourceType,
        resource_pid: &Pid,
        action: Action,
    ) -> Result<bool> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let Some(user) = uow.get_user_by_pid(&principal.user_pid).await? else {
                debug!(caller = %principal.user_pid, "unknown caller");
                return Ok(false);
            };
            let Some(group) = uow.get_group_by_pid(group_pid).await? else {
                debug!(group = %group_pid, "unknown group");
                return Ok(false);
            };
            let resolver = AccessResolver::new(TxAssignments::new(&uow));
            if !resolver
                .is_allowed(user.id, Resource::Group(group.id), Action::Read)
                .await
            {
                warn!(user = %user.pid, group = %group.pid, "group is not visible to caller");
                return Ok(false);
            }
            let Some(resource) = resolve_resource(&uow, resource_type, resource_pid).await? else {
                debug!(resource = %resource_pid, "unknown resource");
                return Ok(false);
            };

            match resolver.authorize_group(group.id, resource, action).await {
                Ok(allowed) => Ok(allowed),
                Err(e) => {
                    warn!(group = %group.pid, %resource, %action, error = %e, "group check failed");
                    Ok(false)
                }
            }
        }
        .await;
        uow.finish(result).await
    }

    /// the user row behind the principal. an unknown caller is unauthorized.
    pub(crate) async fn caller(&self, uow: &UnitOfWork, principal: &Principal) -> Result<User> {
        match uow.get_user_by_pid(&principal.user_pid).await? {
            Some(user) => Ok(user),
            None => {
                warn!(caller = %principal.user_pid, "principal does not resolve to a user");
                Err(Error::NotAuthorized)
            }
        }
    }

    /// fail with `NotAuthorized` unless `user` may perform `action`.
    ///
    /// lookup failures are denials.
    pub(crate) async fn require(
        &self,
        uow: &UnitOfWork,
        user: &User,
        resource: Resource,
        action: Action,
    ) -> Result<()> {
        let resolver = AccessResolver::new(TxAssignments::new(uow));
        match resolver.authorize(user.id, resource, action).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(user = %user.pid, %resource, %action, "access denied");
                Err(Error::NotAuthorized)
            }
            Err(e) => {
                warn!(user = %user.pid, %resource, %action, error = %e, "access check failed");
                Err(Error::NotAuthorized)
            }
        }
    }

    /// write a new assignment of `identity` on `resource`.
    pub(crate) async fn assign(
        &self,
        uow: &UnitOfWork,
        identity: (Identity, &Pid),
        resource: (Resource, &Pid),
        permission: Permission,
    ) -> Result<PermissionAssignment> {
        let assignment = PermissionAssignment::with_pid(
            (self.assignment_pid)(),
            identity.0,
            identity.1.clone(),
            resource.0,
            resource.1.clone(),
            permission,
        );
        Ok(uow.create_assignment(&assignment).await?)
    }

    /// make `user` the owner of a freshly created resource.
    pub(crate) async fn assign_owner(
        &self,
        uow: &UnitOfWork,
        user: &User,
        resource: Resource,
        resource_pid: &Pid,
    ) -> Result<PermissionAssignment> {
        self.assign(
            uow,
            (Identity::User(user.id), &user.pid),
            (resource, resource_pid),
            Permission::Owner,
        )
        .await
    }
}

/// look up a resource by type and pid. `None` when the pid is of another
/// kind or names no row.
pub(crate) async fn resolve_resource(
    uow: &UnitOfWork,
    resource_type: ResourceType,
    pid: &Pid,
) -> Result<Option<Resource>> {
    if pid.kind() != resource_type.pid_kind() {
        return Ok(None);
    }

    let resource = match resource_type {
        ResourceType::Vault => uow
            .get_vault_by_pid(pid)
            .await?
            .map(|v| Resource::Vault(v.id)),
        ResourceType::Credential => uow
            .get_credential_by_pid(pid)
            .await?
            .map(|c| Resource::Credential(c.id)),
        ResourceType::Group => uow
            .get_group_by_pid(pid)
            .await?
            .map(|g| Resource::Group(g.id)),
    };
    Ok(resource)
}

/// like [`resolve_resource`], with `NotFound` for a missing resource.
pub(crate) async fn find_resource(
    uow: &UnitOfWork,
    resource_type: ResourceType,
    pid: &Pid,
) -> Result<Resource> {
    resolve_resource(uow, resource_type, pid)
        .await?
        .ok_or_else(|| Error::not_found(format!("{resource_type} {pid}")))
}
