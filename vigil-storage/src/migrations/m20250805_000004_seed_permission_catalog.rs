use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// The fixed permission catalog shared by every organization.
///
/// Tuples are (name, resource, action, description). Role grants
/// reference these rows by name, so renaming an entry is a breaking
/// change that needs its own migration.
const PERMISSION_CATALOG: &[(&str, &str, &str, &str)] = &[
    ("containers:read", "containers", "read", "View container status and details"),
    ("containers:operate", "containers", "operate", "Start, stop and restart containers"),
    ("alerts:read", "alerts", "read", "View alerts and alert history"),
    ("alerts:operate", "alerts", "operate", "Acknowledge and resolve alerts"),
    ("logs:read", "logs", "read", "Search and tail service logs"),
    ("metrics:read", "metrics", "read", "View metrics and dashboards"),
    ("incidents:read", "incidents", "read", "View incidents and their timelines"),
    ("incidents:operate", "incidents", "operate", "Open, update and close incidents"),
    ("users:read", "users", "read", "View organization members"),
    ("users:manage", "users", "manage", "Invite and manage organization members"),
    ("roles:read", "roles", "read", "View roles and their permissions"),
    ("roles:manage", "roles", "manage", "Create, update and delete roles"),
    ("api-keys:read", "api-keys", "read", "View API keys"),
    ("api-keys:manage", "api-keys", "manage", "Create and revoke API keys"),
    ("organization:manage", "organization", "manage", "Manage organization settings"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = sea_query::Query::insert()
            .into_table(Permissions::Table)
            .columns([
                Permissions::Name,
                Permissions::Resource,
                Permissions::Action,
                Permissions::Description,
            ])
            .to_owned();

        for (name, resource, action, description) in PERMISSION_CATALOG {
            insert
                .values([
                    (*name).into(),
                    (*resource).into(),
                    (*action).into(),
                    (*description).into(),
                ])
                .map_err(|e| DbErr::Custom(format!("Failed to build permission insert: {}", e)))?;
        }

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The catalog is migration-owned, so down clears the table
        manager
            .exec_stmt(sea_query::Query::delete().from_table(Permissions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Permissions {
    Table,
    Name,
    Resource,
    Action,
    Description,
}
