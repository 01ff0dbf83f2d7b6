//! Database migrations for the Vigil schema
//!
//! Migrations run in order at startup (when auto-migrate is enabled)
//! or through the connection wrapper's `migrate()`.

use sea_orm_migration::prelude::*;

mod m20250805_000001_create_identity_tables;
mod m20250805_000002_create_rbac_tables;
mod m20250805_000003_create_api_access_tables;
mod m20250805_000004_seed_permission_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250805_000001_create_identity_tables::Migration),
            Box::new(m20250805_000002_create_rbac_tables::Migration),
            Box::new(m20250805_000003_create_api_access_tables::Migration),
            Box::new(m20250805_000004_seed_permission_catalog::Migration),
        ]
    }
}
