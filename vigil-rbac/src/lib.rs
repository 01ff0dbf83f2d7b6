//! RBAC (Role-Based Access Control) engine for Vigil
//!
//! This crate provides multi-tenant role-based access control with support for:
//! - System roles (Admin, Operator, Viewer) seeded per organization
//! - Custom roles with arbitrary permission sets
//! - Organization isolation for every role and assignment operation
//! - Permission checks backed by the relational store

pub mod auth;
pub mod catalog;
pub mod error;
pub mod permissions;
pub mod roles;

pub use auth::AuthContext;
pub use catalog::{ADMIN_ROLE, OPERATOR_ROLE, VIEWER_ROLE};
pub use error::{RbacError, RbacResult};
pub use permissions::{PermissionChecker, PermissionSet};
pub use roles::{CreateRole, RoleService};
