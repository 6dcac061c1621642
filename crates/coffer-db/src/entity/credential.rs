//! credential envelope entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use coffer_types::{Credential, CredentialId, Pid, PidKind};

/// credential envelope database model.
///
/// `kind` selects the payload table `payload_id` points into.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub pid: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub kind: String,
    pub payload_id: i64,
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

impl TryFrom<Model> for Credential {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Credential {
            id: CredentialId(model.id as u64),
            pid: Pid::of_kind(model.pid, PidKind::Credential)?,
            name: model.name,
            notes: model.notes,
            kind: model.kind.parse()?,
            payload_id: model.payload_id as u64,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Credential> for ActiveModel {
    fn from(credential: &Credential) -> Self {
        ActiveModel {
            id: if credential.id.0 == 0 {
                NotSet
            } else {
                Set(credential.id.0 as i64)
            },
            pid: Set(credential.pid.to_string()),
            name: Set(credential.name.clone()),
            notes: Set(credential.notes.clone()),
            kind: Set(credential.kind.as_str().to_string()),
            payload_id: Set(credential.payload_id as i64),
            created_at: Set(credential.created_at),
            updated_at: Set(credential.updated_at),
        }
    }
}
