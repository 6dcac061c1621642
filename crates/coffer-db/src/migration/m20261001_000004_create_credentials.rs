//! create the credential envelope and payload tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Credentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Credentials::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Credentials::Pid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Credentials::Name).string().not_null())
                    .col(ColumnDef::new(Credentials::Notes).text().not_null())
                    .col(ColumnDef::new(Credentials::Kind).string().not_null())
                    .col(ColumnDef::new(Credentials::PayloadId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Credentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Credentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PasswordCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordCredentials::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PasswordCredentials::Username)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordCredentials::Password)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordCredentials::Strength)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PasswordCredentials::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PasswordCredentials::TotpSecret).binary())
                    .col(ColumnDef::new(PasswordCredentials::TotpLength).integer())
                    .col(ColumnDef::new(PasswordCredentials::TotpPeriod).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FileCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileCredentials::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FileCredentials::BlobKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(FileCredentials::FileName).string().not_null())
                    .col(ColumnDef::new(FileCredentials::ExpiresAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FeatureFlagCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeatureFlagCredentials::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FeatureFlagCredentials::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeatureFlagCredentials::Environment)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FeatureFlagData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeatureFlagData::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FeatureFlagData::FlagSetId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FeatureFlagData::Name).string().not_null())
                    .col(ColumnDef::new(FeatureFlagData::Key).string().not_null())
                    .col(ColumnDef::new(FeatureFlagData::Value).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_feature_flag_data_set_key")
                    .table(FeatureFlagData::Table)
                    .col(FeatureFlagData::FlagSetId)
                    .col(FeatureFlagData::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FeatureFlagData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeatureFlagCredentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FileCredentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PasswordCredentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Credentials {
    Table,
    Id,
    Pid,
    Name,
    Notes,
    Kind,
    PayloadId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PasswordCredentials {
    #[sea_orm(iden = "password_credentials")]
    Table,
    Id,
    Username,
    Password,
    Strength,
    ExpiresAt,
    TotpSecret,
    TotpLength,
    TotpPeriod,
}

#[derive(DeriveIden)]
pub enum FileCredentials {
    #[sea_orm(iden = "file_credentials")]
    Table,
    Id,
    BlobKey,
    FileName,
    ExpiresAt,
}

#[derive(DeriveIden)]
pub enum FeatureFlagCredentials {
    #[sea_orm(iden = "feature_flag_credentials")]
    Table,
    Id,
    Name,
    Environment,
}

#[derive(DeriveIden)]
pub enum FeatureFlagData {
    #[sea_orm(iden = "feature_flag_data")]
    Table,
    Id,
    FlagSetId,
    Name,
    Key,
    Value,
}
