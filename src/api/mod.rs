//! API module
//!
//! Thin HTTP surface exposed to collaborators.

pub mod middleware;
pub mod routes;

pub use routes::{create_router, health_check, AppState};
