//! groups: named sets of users that hold permissions together.
//!
//! a user is a member of a group when they hold any assignment on it. the
//! creator owns the group; members are added with the level they are given.

use tracing::info;

use coffer_db::UnitOfWork;
use coffer_types::{Action, Group, Identity, Permission, Pid, Principal, Resource};

use crate::error::{Error, Result};
use crate::Coffer;

/// a member to add to a new group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// the member's user pid.
    pub user: Pid,
    /// their level on the group.
    pub permission: Permission,
}

/// a group to create.
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    /// display name.
    pub name: String,
    /// free text.
    pub description: String,
    /// initial members. the creator is added as owner regardless.
    pub members: Vec<GroupMember>,
}

/// changes to a group. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    /// new name.
    pub name: Option<String>,
    /// new description.
    pub description: Option<String>,
}

async fn find_group(uow: &UnitOfWork, pid: &Pid) -> Result<Group> {
    uow.get_group_by_pid(pid)
        .await?
        .ok_or_else(|| Error::not_found(format!("group {pid}")))
}

impl Coffer {
    /// create a group owned by the caller, with its initial members.
    pub async fn create_group(&self, principal: &Principal, new: NewGroup) -> Result<Group> {
        let uow = self.db.begin().await?;
        let result = self.create_group_in(&uow, principal, new).await;
        uow.finish(result).await
    }

    async fn create_group_in(
        &self,
        uow: &UnitOfWork,
        principal: &Principal,
        new: NewGroup,
    ) -> Result<Group> {
        let user = self.caller(uow, principal).await?;
        if new.name.trim().is_empty() {
            return Err(Error::Validation("group name must not be empty".to_string()));
        }

        let group = uow
            .create_group(&Group::new(new.name, new.description))
            .await?;
        let resource = Resource::Group(group.id);
        self.assign_owner(uow, &user, resource, &group.pid).await?;

        for member in &new.members {
            if member.user == user.pid {
                continue;
            }
            let member_user = uow
                .get_user_by_pid(&member.user)
                .await?
                .ok_or_else(|| Error::not_found(format!("user {}", member.user)))?;
            if uow
                .find_assignment(Identity::User(member_user.id), resource)
                .await?
                .is_some()
            {
                return Err(Error::Validation(format!(
                    "user {} is listed twice",
                    member.user
                )));
            }
            self.assign(
                uow,
                (Identity::User(member_user.id), &member_user.pid),
                (resource, &group.pid),
                member.permission,
            )
            .await?;
        }

        info!(group = %group.pid, owner = %user.pid, members = new.members.len(), "created group");
        Ok(group)
    }

    /// a group the caller may read.
    pub async fn get_group(&self, principal: &Principal, pid: &Pid) -> Result<Group> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let group = find_group(&uow, pid).await?;
            self.require(&uow, &user, Resource::Group(group.id), Action::Read)
                .await?;
            Ok(group)
        }
        .await;
        uow.finish(result).await
    }

    /// rename a group or change its description.
    pub async fn edit_group(
        &self,
        principal: &Principal,
        pid: &Pid,
        update: GroupUpdate,
    ) -> Result<Group> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let mut group = find_group(&uow, pid).await?;
            self.require(&uow, &user, Resource::Group(group.id), Action::Update)
                .await?;

            if let Some(name) = update.name {
                if name.trim().is_empty() {
                    return Err(Error::Validation("group name must not be empty".to_string()));
                }
                group.name = name;
            }
            if let Some(description) = update.description {
                group.description = description;
            }
            let group = uow.update_group(&group).await?;
            info!(group = %group.pid, by = %user.pid, "edited group");
            Ok(group)
        }
        .await;
        uow.finish(result).await
    }

    /// delete a group, its memberships and every assignment it holds.
    pub async fn delete_group(&self, principal: &Principal, pid: &Pid) -> Result<()> {
        let uow = self.db.begin().await?;
        let result: Result<_> = async {
            let user = self.caller(&uow, principal).await?;
            let group = find_group(&uow, pid).await?;
            self.require(&uow, &user, Resource::Group(group.id), Action::Delete)
                .await?;

            let memberships = uow.delete_assignments_on(Resource::Group(group.id)).await?;
            let held = uow
                .delete_assignments_held_by(Identity::Group(group.id))
                .await?;
            uow.delete_group_row(group.id).await?;

            info!(group = %group.pid, by = %user.pid, memberships, held, "deleted group");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{register, service};
    use crate::vaults::NewVault;
    use coffer_types::{PidKind, ResourceType};

    #[tokio::test]
    async fn test_create_group_with_members() {
        let (coffer, alice) = service().await;
        let bob = register(&coffer, "bob").await;
        let carol = register(&coffer, "carol").await;

        let new = NewGroup {
            name: "sre".to_string(),
            description: String::new(),
            members: vec![
                GroupMember {
                    user: bob.user_pid.clone(),
                    permission: Permission::View,
                },
                GroupMember {
                    user: alice.user_pid.clone(),
                    permission: Permission::View,
                },
            ],
        };
        let group = coffer.create_group(&alice, new).await.unwrap();

        assert_eq!(coffer.get_group(&bob, &group.pid).await.unwrap().name, "sre");
        assert!(matches!(
            coffer.get_group(&carol, &group.pid).await,
            Err(Error::NotAuthorized)
        ));
        // view is not enough to rename
        let rename = |name: &str| GroupUpdate {
            name: Some(name.to_string()),
            ..Default::default()
        };
        assert!(matches!(
            coffer.edit_group(&bob, &group.pid, rename("x")).await,
            Err(Error::NotAuthorized)
        ));
        let edited = coffer
            .edit_group(&alice, &group.pid, rename("ops"))
            .await
            .unwrap();
        assert_eq!(edited.name, "ops");
    }

    #[tokio::test]
    async fn test_create_group_unknown_member_rolls_back() {
        let (coffer, alice) = service().await;
        let new = NewGroup {
            name: "sre".to_string(),
            description: String::new(),
            members: vec![GroupMember {
                user: Pid::generate(PidKind::User),
                permission: Permission::View,
            }],
        };
        assert!(matches!(
            coffer.create_group(&alice, new).await,
            Err(Error::NotFound(_))
        ));

        let uow = coffer.db().begin().await.unwrap();
        let report = uow.integrity_report().await.unwrap();
        uow.commit().await.unwrap();
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_group_grants_reach_members() {
        let (coffer, alice) = service().await;
        let bob = register(&coffer, "bob").await;
        let vault = coffer
            .create_vault(&alice, NewVault::new("ops"))
            .await
            .unwrap();
        let group = coffer
            .create_group(
                &alice,
                NewGroup {
                    name: "sre".into(),
                    members: vec![GroupMember {
                        user: bob.user_pid.clone(),
                        permission: Permission::View,
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        coffer
            .grant_permissions(
                &alice,
                vec![crate::GrantRequest::new(
                    ResourceType::Vault,
                    vault.pid.clone(),
                    coffer_types::IdentityType::Group,
                    group.pid.clone(),
                    Permission::Edit,
                )],
            )
            .await
            .unwrap();
        assert!(coffer
            .authorize(&bob, ResourceType::Vault, &vault.pid, Action::Update)
            .await
            .unwrap());

        coffer.delete_group(&alice, &group.pid).await.unwrap();
        assert!(!coffer
            .authorize(&bob, ResourceType::Vault, &vault.pid, Action::Read)
            .await
            .unwrap());

        let uow = coffer.db().begin().await.unwrap();
        let report = uow.integrity_report().await.unwrap();
        uow.commit().await.unwrap();
        assert!(report.is_clean(), "{report}");
    }
}
