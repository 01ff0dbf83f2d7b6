//! Vigil Server
//!
//! Wires configuration, storage, services and the REST router into a
//! runnable process. The binary entry point lives in `main.rs`; everything
//! here is also reachable from integration tests.

pub mod services;
pub mod startup;

// Re-export main components
pub use services::{init_logging, ServiceContainer};
pub use startup::Server;
