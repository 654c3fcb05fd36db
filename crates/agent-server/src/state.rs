//! Application State

use std::sync::Arc;

use agent_core::Agent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The assembled agent (profile + tools + model client)
    pub agent: Arc<Agent>,
}
