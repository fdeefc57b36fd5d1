//! Request handler module
//!
//! Routes requests to the file server, the hit counter endpoints, chirp
//! validation and the health check.

pub mod chirp;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::Router;
