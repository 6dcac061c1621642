//! database migrations for coffer.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_groups;
mod m20261001_000003_create_vaults;
mod m20261001_000004_create_credentials;
mod m20261001_000005_create_permission_assignments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_groups::Migration),
            Box::new(m20261001_000003_create_vaults::Migration),
            Box::new(m20261001_000004_create_credentials::Migration),
            Box::new(m20261001_000005_create_permission_assignments::Migration),
        ]
    }
}
