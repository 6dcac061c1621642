//! create vaults and vault_credentials tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vaults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vaults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vaults::Pid).string().not_null().unique_key())
                    .col(ColumnDef::new(Vaults::Name).string().not_null())
                    .col(ColumnDef::new(Vaults::Description).text().not_null())
                    .col(ColumnDef::new(Vaults::PublicKey).binary().not_null())
                    .col(
                        ColumnDef::new(Vaults::IsPersonal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Vaults::PersonalOwnerId).big_integer())
                    .col(
                        ColumnDef::new(Vaults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vaults::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // one personal vault per user; nulls (shared vaults) don't collide
        manager
            .create_index(
                Index::create()
                    .name("idx_vaults_personal_owner")
                    .table(Vaults::Table)
                    .col(Vaults::PersonalOwnerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VaultCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaultCredentials::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VaultCredentials::VaultId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaultCredentials::CredentialId)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vault_credentials_pair")
                    .table(VaultCredentials::Table)
                    .col(VaultCredentials::VaultId)
                    .col(VaultCredentials::CredentialId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // containment lookups go credential -> vaults
        manager
            .create_index(
                Index::create()
                    .name("idx_vault_credentials_credential_id")
                    .table(VaultCredentials::Table)
                    .col(VaultCredentials::CredentialId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultCredentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vaults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vaults {
    Table,
    Id,
    Pid,
    Name,
    Description,
    PublicKey,
    IsPersonal,
    PersonalOwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum VaultCredentials {
    #[sea_orm(iden = "vault_credentials")]
    Table,
    Id,
    VaultId,
    CredentialId,
}
