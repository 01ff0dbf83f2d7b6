pub mod api_keys;
pub mod auth;
pub mod common;
pub mod roles;

// Re-export commonly used types
pub use api_keys::*;
pub use auth::*;
pub use common::*;
pub use roles::*;
