//! Application state for the API server

use crate::{Config, TaskPipeline};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The task pipeline serving every request
    pub pipeline: Arc<TaskPipeline>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<TaskPipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }
}
