//! Fixed-window rate limit counters, one row per active window key

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_limits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Window key, typically "<scope>:<client>" (unique)
    #[sea_orm(unique)]
    pub key: String,
    /// Requests counted in the current window
    pub requests: i32,
    /// When the current window opened
    pub window_start: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
