//! the permission engine's view of an open unit of work.

use coffer_db::UnitOfWork;
use coffer_grants::AssignmentSource;
use coffer_types::{CredentialId, GroupId, Identity, Permission, Resource, UserId, VaultId};

/// reads the assignment graph inside the caller's transaction, so a check
/// sees the rows written earlier in the same operation.
pub struct TxAssignments<'a> {
    uow: &'a UnitOfWork,
}

impl<'a> TxAssignments<'a> {
    /// wrap an open unit of work.
    pub fn new(uow: &'a UnitOfWork) -> Self {
        Self { uow }
    }
}

impl AssignmentSource for TxAssignments<'_> {
    type Error = coffer_db::Error;

    async fn direct_permission(
        &self,
        identity: Identity,
        resource: Resource,
    ) -> Result<Option<Permission>, Self::Error> {
        self.uow.direct_permission(identity, resource).await
    }

    async fn group_memberships(&self, user: UserId) -> Result<Vec<GroupId>, Self::Error> {
        self.uow.group_memberships(user).await
    }

    async fn containing_vaults(
        &self,
        credential: CredentialId,
    ) -> Result<Vec<VaultId>, Self::Error> {
        self.uow.vaults_for_credential(credential).await
    }
}
