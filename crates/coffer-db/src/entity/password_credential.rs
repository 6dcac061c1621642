//! password payload entity. secret columns hold ciphertext.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::payload::{PasswordRecord, TotpRecord};

/// password_credentials database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "password_credentials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    /// nonce || ciphertext.
    #[sea_orm(column_type = "VarBinary(StringLen::None)")]
    pub password: Vec<u8>,
    pub strength: i32,
    pub expires_at: Option<DateTime<Utc>>,
    /// nonce || ciphertext of the totp seed.
    #[sea_orm(column_type = "VarBinary(StringLen::None)", nullable)]
    pub totp_secret: Option<Vec<u8>>,
    pub totp_length: Option<i32>,
    pub totp_period: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PasswordRecord {
    fn from(model: Model) -> Self {
        // a seed without length and period is unusable, treat it as absent
        let totp = match (model.totp_secret, model.totp_length, model.totp_period) {
            (Some(secret), Some(length), Some(period)) => Some(TotpRecord {
                secret,
                length: length as u8,
                period: period as u32,
            }),
            _ => None,
        };

        PasswordRecord {
            id: model.id as u64,
            username: model.username,
            password: model.password,
            strength: model.strength,
            expires_at: model.expires_at,
            totp,
        }
    }
}

impl From<&PasswordRecord> for ActiveModel {
    fn from(record: &PasswordRecord) -> Self {
        ActiveModel {
            id: if record.id == 0 {
                NotSet
            } else {
                Set(record.id as i64)
            },
            username: Set(record.username.clone()),
            password: Set(record.password.clone()),
            strength: Set(record.strength),
            expires_at: Set(record.expires_at),
            totp_secret: Set(record.totp.as_ref().map(|t| t.secret.clone())),
            totp_length: Set(record.totp.as_ref().map(|t| i32::from(t.length))),
            totp_period: Set(record.totp.as_ref().map(|t| i64::from(t.period))),
        }
    }
}
