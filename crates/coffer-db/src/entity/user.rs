//! user entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use coffer_types::{Pid, PidKind, User, UserId};

/// user database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub pid: String,
    #[sea_orm(unique)]
    pub name: String,
    pub email: Option<String>,
    #[sea_orm(column_type = "VarBinary(StringLen::None)")]
    pub public_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(model.id as u64),
            pid: Pid::of_kind(model.pid, PidKind::User)?,
            name: model.name,
            email: model.email,
            public_key: model.public_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        ActiveModel {
            id: if user.id.0 == 0 {
                NotSet
            } else {
                Set(user.id.0 as i64)
            },
            pid: Set(user.pid.to_string()),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            public_key: Set(user.public_key.clone()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
    }
}
