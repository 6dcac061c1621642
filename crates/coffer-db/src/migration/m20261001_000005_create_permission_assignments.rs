//! create permission_assignments table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PermissionAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PermissionAssignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::Pid)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::IdentityType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::IdentityId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::IdentityPid)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::ResourceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::ResourceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::ResourcePid)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::Permission)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PermissionAssignments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // at most one edge per (identity, resource)
        manager
            .create_index(
                Index::create()
                    .name("idx_permission_assignments_edge")
                    .table(PermissionAssignments::Table)
                    .col(PermissionAssignments::ResourceType)
                    .col(PermissionAssignments::ResourceId)
                    .col(PermissionAssignments::IdentityType)
                    .col(PermissionAssignments::IdentityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // group membership and "held by" lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_permission_assignments_identity")
                    .table(PermissionAssignments::Table)
                    .col(PermissionAssignments::IdentityType)
                    .col(PermissionAssignments::IdentityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PermissionAssignments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PermissionAssignments {
    #[sea_orm(iden = "permission_assignments")]
    Table,
    Id,
    Pid,
    IdentityType,
    IdentityId,
    IdentityPid,
    ResourceType,
    ResourceId,
    ResourcePid,
    Permission,
    CreatedAt,
    UpdatedAt,
}
