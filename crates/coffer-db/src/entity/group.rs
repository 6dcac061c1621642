//! group entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use coffer_types::{Group, GroupId, Pid, PidKind};

/// group database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub pid: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Group {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Group {
            id: GroupId(model.id as u64),
            pid: Pid::of_kind(model.pid, PidKind::Group)?,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        ActiveModel {
            id: if group.id.0 == 0 {
                NotSet
            } else {
                Set(group.id.0 as i64)
            },
            pid: Set(group.pid.to_string()),
            name: Set(group.name.clone()),
            description: Set(group.description.clone()),
            created_at: Set(group.created_at),
            updated_at: Set(group.updated_at),
        }
    }
}
