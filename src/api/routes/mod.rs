//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`upload`] — The relay's working endpoint
//! - [`system`] — Liveness, health, OpenAPI

mod system;
mod upload;

// Re-export all handlers so `routes::function_name` works (and utoipa can
// resolve its generated path items through this module)
pub use system::*;
pub use upload::*;
