//! permission assignment entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use coffer_types::{AssignmentId, Identity, PermissionAssignment, Pid, PidKind, Resource};

/// permission_assignments database model.
///
/// both ends are stored as (type tag, internal key, pid). the
/// (resource_type, resource_id, identity_type, identity_id) tuple is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "permission_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub pid: String,
    pub identity_type: String,
    pub identity_id: i64,
    pub identity_pid: String,
    pub resource_type: String,
    pub resource_id: i64,
    pub resource_pid: String,
    pub permission: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PermissionAssignment {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let identity = Identity::from_parts(model.identity_type.parse()?, model.identity_id as u64);
        let resource = Resource::from_parts(model.resource_type.parse()?, model.resource_id as u64);

        Ok(PermissionAssignment {
            id: AssignmentId(model.id as u64),
            pid: Pid::of_kind(model.pid, PidKind::Assignment)?,
            identity_pid: Pid::of_kind(model.identity_pid, identity.identity_type().pid_kind())?,
            identity,
            resource_pid: Pid::of_kind(model.resource_pid, resource.resource_type().pid_kind())?,
            resource,
            permission: model.permission.parse()?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&PermissionAssignment> for ActiveModel {
    fn from(assignment: &PermissionAssignment) -> Self {
        ActiveModel {
            id: if assignment.id.0 == 0 {
                NotSet
            } else {
                Set(assignment.id.0 as i64)
            },
            pid: Set(assignment.pid.to_string()),
            identity_type: Set(assignment.identity.identity_type().as_str().to_string()),
            identity_id: Set(assignment.identity.raw_id() as i64),
            identity_pid: Set(assignment.identity_pid.to_string()),
            resource_type: Set(assignment.resource.resource_type().as_str().to_string()),
            resource_id: Set(assignment.resource.raw_id() as i64),
            resource_pid: Set(assignment.resource_pid.to_string()),
            permission: Set(assignment.permission.as_str().to_string()),
            created_at: Set(assignment.created_at),
            updated_at: Set(assignment.updated_at),
        }
    }
}
