//! Application state for the API server

use crate::{Config, Relay};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones); carries the process-scoped relay
/// handle and the configuration.
#[derive(Clone)]
pub struct AppState {
    /// The relay instance handling fetch + upload
    pub relay: Arc<Relay>,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(relay: Arc<Relay>, config: Arc<Config>) -> Self {
        Self { relay, config }
    }
}
