//! the permission resolution engine.

use std::future::Future;

use tracing::{debug, warn};

use coffer_types::{
    Action, CredentialId, GroupId, Identity, Permission, Resource, UserId, VaultId,
};

use crate::error::{Error, Result};

/// where the engine reads the assignment graph from.
///
/// implementations must read fresh data on every call; the engine never
/// caches decisions.
pub trait AssignmentSource: Send + Sync {
    /// lookup failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// the level `identity` holds directly on `resource`, if any.
    fn direct_permission(
        &self,
        identity: Identity,
        resource: Resource,
    ) -> impl Future<Output = std::result::Result<Option<Permission>, Self::Error>> + Send;

    /// groups the user is a member of. empty when there are none.
    fn group_memberships(
        &self,
        user: UserId,
    ) -> impl Future<Output = std::result::Result<Vec<GroupId>, Self::Error>> + Send;

    /// vaults that contain the credential. empty when there are none.
    fn containing_vaults(
        &self,
        credential: CredentialId,
    ) -> impl Future<Output = std::result::Result<Vec<VaultId>, Self::Error>> + Send;
}

/// how a candidate assignment reaches the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// held directly on the resource.
    Direct,
    /// held by a group the user belongs to.
    Group(GroupId),
    /// held directly on a vault containing the credential.
    Vault(VaultId),
    /// held by a group on a vault containing the credential.
    VaultGroup(VaultId, GroupId),
}

/// one assignment that bears on a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// the path to the assignment.
    pub via: Via,
    /// the level it carries.
    pub permission: Permission,
}

/// resolves permissions against an [`AssignmentSource`].
pub struct AccessResolver<S> {
    source: S,
}

impl<S: AssignmentSource> AccessResolver<S> {
    /// create a resolver over the given source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// every assignment that applies to `user` on `resource`.
    ///
    /// 1. direct: user → resource
    /// 2. group: each group of the user → resource
    /// 3. credentials only: steps 1 and 2 for every containing vault
    pub async fn candidates(
        &self,
        user: UserId,
        resource: Resource,
    ) -> Result<Vec<Candidate>, S::Error> {
        let groups = self
            .source
            .group_memberships(user)
            .await
            .map_err(Error::Lookup)?;

        let mut found = Vec::new();
        self.collect(user, &groups, resource, None, &mut found)
            .await?;

        if let Resource::Credential(credential) = resource {
            let vaults = self
                .source
                .containing_vaults(credential)
                .await
                .map_err(Error::Lookup)?;
            for vault in vaults {
                self.collect(user, &groups, Resource::Vault(vault), Some(vault), &mut found)
                    .await?;
            }
        }

        Ok(found)
    }

    async fn collect(
        &self,
        user: UserId,
        groups: &[GroupId],
        resource: Resource,
        vault: Option<VaultId>,
        found: &mut Vec<Candidate>,
    ) -> Result<(), S::Error> {
        if let Some(permission) = self.direct(Identity::User(user), resource).await? {
            let via = match vault {
                Some(vault) => Via::Vault(vault),
                None => Via::Direct,
            };
            found.push(Candidate { via, permission });
        }

        for &group in groups {
            if let Some(permission) = self.direct(Identity::Group(group), resource).await? {
                let via = match vault {
                    Some(vault) => Via::VaultGroup(vault, group),
                    None => Via::Group(group),
                };
                found.push(Candidate { via, permission });
            }
        }
        Ok(())
    }

    async fn direct(
        &self,
        identity: Identity,
        resource: Resource,
    ) -> Result<Option<Permission>, S::Error> {
        self.source
            .direct_permission(identity, resource)
            .await
            .map_err(Error::Lookup)
    }

    /// whether `user` may perform `action` on `resource`.
    ///
    /// allowed iff any candidate's level is on the action's whitelist. an
    /// error means the check failed; treat it as a denial.
    pub async fn authorize(
        &self,
        user: UserId,
        resource: Resource,
        action: Action,
    ) -> Result<bool, S::Error> {
        let candidates = self.candidates(user, resource).await?;
        let granting = candidates.iter().find(|c| action.permits(c.permission));

        match granting {
            Some(candidate) => {
                debug!(%user, %resource, %action, via = ?candidate.via, "access allowed");
                Ok(true)
            }
            None => {
                debug!(%user, %resource, %action, candidates = candidates.len(), "access denied");
                Ok(false)
            }
        }
    }

    /// whether a group, acting as itself, may perform `action` on `resource`.
    ///
    /// considers the group's own assignment on the resource and, for
    /// credentials, on each containing vault.
    pub async fn authorize_group(
        &self,
        group: GroupId,
        resource: Resource,
        action: Action,
    ) -> Result<bool, S::Error> {
        let identity = Identity::Group(group);
        let permits = |level: Option<Permission>| level.is_some_and(|l| action.permits(l));

        if permits(self.direct(identity, resource).await?) {
            return Ok(true);
        }

        if let Resource::Credential(credential) = resource {
            let vaults = self
                .source
                .containing_vaults(credential)
                .await
                .map_err(Error::Lookup)?;
            for vault in vaults {
                if permits(self.direct(identity, Resource::Vault(vault)).await?) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// like [`Self::authorize`], but a lookup failure is logged and denies.
    pub async fn is_allowed(&self, user: UserId, resource: Resource, action: Action) -> bool {
        match self.authorize(user, resource, action).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(%user, %resource, %action, error = %e, "permission check failed, denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    #[error("store unavailable")]
    struct Unavailable;

    #[derive(Default)]
    struct FakeSource {
        edges: HashMap<(Identity, Resource), Permission>,
        memberships: HashMap<UserId, Vec<GroupId>>,
        containment: HashMap<CredentialId, Vec<VaultId>>,
        broken: bool,
    }

    impl FakeSource {
        fn grant(mut self, identity: Identity, resource: Resource, level: Permission) -> Self {
            self.edges.insert((identity, resource), level);
            self
        }

        fn member(mut self, user: UserId, group: GroupId) -> Self {
            self.memberships.entry(user).or_default().push(group);
            self
        }

        fn contain(mut self, credential: CredentialId, vault: VaultId) -> Self {
            self.containment.entry(credential).or_default().push(vault);
            self
        }
    }

    impl AssignmentSource for FakeSource {
        type Error = Unavailable;

        async fn direct_permission(
            &self,
            identity: Identity,
            resource: Resource,
        ) -> std::result::Result<Option<Permission>, Unavailable> {
            if self.broken {
                return Err(Unavailable);
            }
            Ok(self.edges.get(&(identity, resource)).copied())
        }

        async fn group_memberships(
            &self,
            user: UserId,
        ) -> std::result::Result<Vec<GroupId>, Unavailable> {
            Ok(self.memberships.get(&user).cloned().unwrap_or_default())
        }

        async fn containing_vaults(
            &self,
            credential: CredentialId,
        ) -> std::result::Result<Vec<VaultId>, Unavailable> {
            Ok(self.containment.get(&credential).cloned().unwrap_or_default())
        }
    }

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const OPS: GroupId = GroupId(10);
    const VAULT: VaultId = VaultId(100);
    const CRED: CredentialId = CredentialId(1000);
    const ACTIONS: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    #[tokio::test]
    async fn test_no_assignments_denies_everything() {
        let resolver = AccessResolver::new(FakeSource::default());

        for resource in [
            Resource::Vault(VAULT),
            Resource::Credential(CRED),
            Resource::Group(OPS),
        ] {
            for action in ACTIONS {
                assert!(!resolver.authorize(ALICE, resource, action).await.unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_direct_assignment_uses_whitelist() {
        let source = FakeSource::default().grant(
            Identity::User(ALICE),
            Resource::Credential(CRED),
            Permission::Edit,
        );
        let resolver = AccessResolver::new(source);
        let cred = Resource::Credential(CRED);

        assert!(resolver.authorize(ALICE, cred, Action::Read).await.unwrap());
        assert!(resolver.authorize(ALICE, cred, Action::Update).await.unwrap());
        assert!(!resolver.authorize(ALICE, cred, Action::Delete).await.unwrap());
        assert!(!resolver.authorize(ALICE, cred, Action::Create).await.unwrap());
        assert!(!resolver.authorize(BOB, cred, Action::Read).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_assignment_applies_to_members() {
        let source = FakeSource::default()
            .member(ALICE, OPS)
            .grant(Identity::Group(OPS), Resource::Vault(VAULT), Permission::Admin);
        let resolver = AccessResolver::new(source);

        assert!(
            resolver
                .authorize(ALICE, Resource::Vault(VAULT), Action::Delete)
                .await
                .unwrap()
        );
        assert!(
            !resolver
                .authorize(BOB, Resource::Vault(VAULT), Action::Read)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_group_edit_on_vault_reaches_contained_credential() {
        let source = FakeSource::default()
            .member(ALICE, OPS)
            .contain(CRED, VAULT)
            .grant(Identity::Group(OPS), Resource::Vault(VAULT), Permission::Edit);
        let resolver = AccessResolver::new(source);
        let cred = Resource::Credential(CRED);

        assert!(resolver.authorize(ALICE, cred, Action::Read).await.unwrap());
        assert!(resolver.authorize(ALICE, cred, Action::Update).await.unwrap());
        assert!(!resolver.authorize(ALICE, cred, Action::Delete).await.unwrap());

        let candidates = resolver.candidates(ALICE, cred).await.unwrap();
        assert_eq!(
            candidates,
            vec![Candidate {
                via: Via::VaultGroup(VAULT, OPS),
                permission: Permission::Edit
            }]
        );
    }

    #[tokio::test]
    async fn test_containment_only_for_credentials() {
        // a vault assignment never leaks onto a group resource
        let source = FakeSource::default().grant(
            Identity::User(ALICE),
            Resource::Vault(VAULT),
            Permission::Owner,
        );
        let resolver = AccessResolver::new(source);

        assert!(
            !resolver
                .authorize(ALICE, Resource::Group(OPS), Action::Read)
                .await
                .unwrap()
        );
        // credential not in any vault: containment step is skipped
        assert!(
            !resolver
                .authorize(ALICE, Resource::Credential(CRED), Action::Read)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_union_across_vaults() {
        let other = VaultId(101);
        let source = FakeSource::default()
            .contain(CRED, VAULT)
            .contain(CRED, other)
            .grant(Identity::User(ALICE), Resource::Vault(VAULT), Permission::View)
            .grant(Identity::User(ALICE), Resource::Vault(other), Permission::Admin);
        let resolver = AccessResolver::new(source);

        assert!(
            resolver
                .authorize(ALICE, Resource::Credential(CRED), Action::Delete)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_lookup_error_fails_closed() {
        let mut source = FakeSource::default().grant(
            Identity::User(ALICE),
            Resource::Vault(VAULT),
            Permission::Owner,
        );
        source.broken = true;
        let resolver = AccessResolver::new(source);

        let result = resolver
            .authorize(ALICE, Resource::Vault(VAULT), Action::Read)
            .await;
        assert!(matches!(result, Err(Error::Lookup(Unavailable))));
        assert!(
            !resolver
                .is_allowed(ALICE, Resource::Vault(VAULT), Action::Read)
                .await
        );
    }

    #[tokio::test]
    async fn test_authorize_group_as_subject() {
        let source = FakeSource::default()
            .contain(CRED, VAULT)
            .grant(Identity::Group(OPS), Resource::Vault(VAULT), Permission::View);
        let resolver = AccessResolver::new(source);

        assert!(
            resolver
                .authorize_group(OPS, Resource::Credential(CRED), Action::Read)
                .await
                .unwrap()
        );
        assert!(
            !resolver
                .authorize_group(OPS, Resource::Credential(CRED), Action::Update)
                .await
                .unwrap()
        );
    }
}
