//! Unified API types for the Vigil authentication and RBAC engine
//!
//! This crate provides consistent type definitions shared by the service
//! layer, the middleware and the REST handlers, so every surface speaks the
//! same identifiers, entities and error vocabulary.

pub mod domain;
pub mod errors;
pub mod ids;
pub mod pagination;

// Re-export main types for convenience
pub use domain::{
    UnifiedApiKey, UnifiedOrganization, UnifiedPermission, UnifiedRole, UnifiedSession, UnifiedUser,
};
pub use errors::ApiError;
pub use ids::ApiId;
pub use pagination::{ListResponse, PaginationInput, PaginationMeta};
