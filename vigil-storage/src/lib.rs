//! # Vigil Storage
//!
//! SeaORM-backed storage layer for the Vigil authentication and access
//! control service. This crate owns the database schema (entities and
//! migrations), the connection lifecycle, and the repository
//! implementations behind the `vigil-interfaces` traits.
//!
//! The layout follows a conventional repository pattern:
//!
//! - [`entities`] - SeaORM entity definitions, one module per table
//! - [`migrations`] - schema migrations and the permission catalog seed
//! - [`connection`] - pooled connection wrapper with migration support
//! - [`repositories`] - trait implementations plus the repository factory
//!
//! Handlers and services never touch SeaORM types directly; they work
//! against the `vigil-interfaces` traits and the unified API types.

pub mod config;
pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repositories;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::StorageConfig;
pub use connection::{DatabaseConnection, StorageError};
pub use repositories::SeaOrmRepositoryFactory;
