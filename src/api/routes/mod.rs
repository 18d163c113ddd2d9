//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Task submission, status and result pages
//! - [`export`] - Export archive downloads
//! - [`catalogue`] - Provider listing and name resolution
//! - [`system`] - Health and OpenAPI

use crate::types::{Measurement, ObjectIdentifier, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

mod catalogue;
mod export;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use catalogue::*;
pub use export::*;
pub use system::*;
pub use tasks::*;

/// Default page size for result listings
pub const DEFAULT_PAGE_COUNT: i64 = 100;

/// Largest page a client may request
pub const MAX_PAGE_COUNT: i64 = 10_000;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /tasks/:provider_id/cone-search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConeSearchRequest {
    /// Right ascension of the search centre, degrees
    pub right_ascension_deg: f64,
    /// Declination of the search centre, degrees
    pub declination_deg: f64,
    /// Search radius in arcseconds (default: configured, 30)
    #[serde(default)]
    pub radius_arcsec: Option<f64>,
}

/// Request body for POST /tasks/:provider_id/find-object
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FindObjectRequest {
    /// Object name understood by the name resolver (e.g. "M31")
    pub name: String,
}

/// Response for task submissions
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskCreatedResponse {
    /// Identifier to poll
    pub task_id: TaskId,
}

/// Response for GET /tasks/:task_id/status
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskStatusResponse {
    /// Task identifier
    pub task_id: TaskId,
    /// Current status
    pub status: TaskStatus,
}

/// Query parameters for result listings
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PageQuery {
    /// Rows to skip (default: 0)
    pub offset: Option<i64>,
    /// Rows to return (default: 100, max: 10000)
    pub count: Option<i64>,
}

impl PageQuery {
    /// Offset and count with defaults applied and bounds enforced
    pub fn bounds(&self) -> (i64, i64) {
        let offset = self.offset.unwrap_or(0).max(0);
        let count = self
            .count
            .unwrap_or(DEFAULT_PAGE_COUNT)
            .clamp(1, MAX_PAGE_COUNT);
        (offset, count)
    }
}

/// Page of identifier results
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct IdentifierPage {
    /// Rows in this page
    pub data: Vec<ObjectIdentifier>,
    /// Number of rows in this page
    pub count: usize,
    /// Rows stored for the task
    pub total_items: i64,
}

/// Page of measurement results
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MeasurementPage {
    /// Rows in this page
    pub data: Vec<Measurement>,
    /// Number of rows in this page
    pub count: usize,
    /// Rows stored for the task
    pub total_items: i64,
}

/// Query parameters for POST /export
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ExportQuery {
    /// Bundling mode: "single_file" (default), "by_provider" or "raw_bundle"
    pub mode: Option<String>,
    /// Field delimiter (default: configured, ",")
    pub delimiter: Option<String>,
}

/// Request body for POST /export
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ExportRequest {
    /// Tasks whose results are bundled
    #[serde(default)]
    pub task_ids: Vec<String>,
}

/// Request body for POST /name-resolve
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct NameResolveRequest {
    /// Object name
    pub name: String,
}
