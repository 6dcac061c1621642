//! a single feature flag. unique per (flag_set_id, key).

use sea_orm::entity::prelude::*;

use coffer_types::FeatureFlag;

/// feature_flag_data database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "feature_flag_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub flag_set_id: i64,
    pub name: String,
    pub key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feature_flag_credential::Entity",
        from = "Column::FlagSetId",
        to = "super::feature_flag_credential::Column::Id"
    )]
    FlagSet,
}

impl Related<super::feature_flag_credential::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlagSet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for FeatureFlag {
    fn from(model: Model) -> Self {
        FeatureFlag {
            name: model.name,
            key: model.key,
            value: model.value,
        }
    }
}
