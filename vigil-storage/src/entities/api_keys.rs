//! API key entity for programmatic access
//!
//! Keys are stored as SHA-256 digests with a short display prefix. The
//! permission snapshot taken at issuance lives in `scoped_permissions`
//! as a JSON array of permission names.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// SHA-256 hex digest of the full key (unique)
    #[sea_orm(unique)]
    pub key_hash: String,
    /// Human-readable name for the key
    pub name: String,
    /// Display prefix for identification (e.g. "sk_1a2b3c4d")
    pub key_prefix: String,
    /// User who owns this key
    pub user_id: i32,
    /// Organization the key is scoped to
    pub organization_id: i32,
    /// Permission names captured when the key was issued
    pub scoped_permissions: Json,
    /// Optional expiration timestamp
    pub expires_at: Option<DateTimeUtc>,
    /// When the key was created
    pub created_at: DateTimeUtc,
    /// When the key was last used for authentication
    pub last_used_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Organizations,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
