//! Application state for the web layer.

use std::sync::Arc;

use crate::service::TransitService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Station resolution service
    pub service: Arc<TransitService>,
}

impl AppState {
    pub fn new(service: TransitService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
