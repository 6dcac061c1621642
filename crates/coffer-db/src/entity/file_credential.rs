//! file payload entity. contents live in the blob store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::payload::FileRecord;

/// file_credentials database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "file_credentials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub blob_key: String,
    pub file_name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for FileRecord {
    fn from(model: Model) -> Self {
        FileRecord {
            id: model.id as u64,
            blob_key: model.blob_key,
            file_name: model.file_name,
            expires_at: model.expires_at,
        }
    }
}

impl From<&FileRecord> for ActiveModel {
    fn from(record: &FileRecord) -> Self {
        ActiveModel {
            id: if record.id == 0 {
                NotSet
            } else {
                Set(record.id as i64)
            },
            blob_key: Set(record.blob_key.clone()),
            file_name: Set(record.file_name.clone()),
            expires_at: Set(record.expires_at),
        }
    }
}
