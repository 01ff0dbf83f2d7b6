pub mod api_keys;
pub mod auth;
pub mod health;
pub mod roles;

// Re-export handler functions
pub use api_keys::*;
pub use auth::*;
pub use health::*;
pub use roles::*;
