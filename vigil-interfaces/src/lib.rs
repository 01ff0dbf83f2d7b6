//! # Vigil Interfaces
//!
//! Core interfaces and traits for the Vigil modular architecture.
//!
//! This crate provides the contracts that are shared across the workspace:
//! repository traits over the relational store, the audit sink collaborator,
//! and the internal record types that carry credential material which must
//! never appear in API responses.
//!
//! Services depend on these traits rather than on concrete storage types,
//! which keeps the dependency graph acyclic and makes every service unit
//! testable against mock repositories.
//!
//! ## Main Interfaces
//!
//! - [`RepositoryFactory`] - Access point for all repository implementations
//! - [`UserRepository`] / [`RoleRepository`] / [`RefreshTokenRepository`] -
//!   the storage contracts behind authentication and RBAC
//! - [`AuditSink`] - Fire-and-forget security event recording

pub mod audit;
pub mod database;
#[cfg(feature = "testing")]
pub mod testing;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditSink};
pub use database::{
    ApiKeyRepository, DatabaseError, LoginFailure, NewApiKey, NewPasswordResetToken, NewRefreshToken, NewRole,
    NewUser, OrganizationBootstrap, OrganizationRepository, PasswordResetTokenRecord, PasswordResetTokenRepository,
    PermissionRepository, RateLimitRepository, RateWindow, RefreshTokenRecord, RefreshTokenRepository, Repository,
    RepositoryFactory, RoleChanges, RoleDeleteOutcome, RoleRepository, SystemRoleSeed, UserRecord, UserRepository,
};
