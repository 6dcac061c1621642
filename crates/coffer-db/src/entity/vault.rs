//! vault entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use coffer_types::{Pid, PidKind, UserId, Vault, VaultId};

/// vault database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vaults")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub pid: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "VarBinary(StringLen::None)")]
    pub public_key: Vec<u8>,
    pub is_personal: bool,
    /// set only for personal vaults; unique, so each user has at most one.
    pub personal_owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vault_credential::Entity")]
    VaultCredentials,
}

impl Related<super::vault_credential::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VaultCredentials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Vault {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Vault {
            id: VaultId(model.id as u64),
            pid: Pid::of_kind(model.pid, PidKind::Vault)?,
            name: model.name,
            description: model.description,
            public_key: model.public_key,
            is_personal: model.is_personal,
            personal_owner: model.personal_owner_id.map(|id| UserId(id as u64)),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Vault> for ActiveModel {
    fn from(vault: &Vault) -> Self {
        ActiveModel {
            id: if vault.id.0 == 0 {
                NotSet
            } else {
                Set(vault.id.0 as i64)
            },
            pid: Set(vault.pid.to_string()),
            name: Set(vault.name.clone()),
            description: Set(vault.description.clone()),
            public_key: Set(vault.public_key.clone()),
            is_personal: Set(vault.is_personal),
            personal_owner_id: Set(vault.personal_owner.map(|id| id.0 as i64)),
            created_at: Set(vault.created_at),
            updated_at: Set(vault.updated_at),
        }
    }
}
