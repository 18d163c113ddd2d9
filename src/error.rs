//! Error types for astrocollector
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Task, Provisioning, Provider, Export)
//! - The bulk-write outcome that separates a vanished task from storage failure
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{TaskId, TaskStatus};

/// Result type alias for astrocollector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for astrocollector
///
/// This is the primary error type used throughout the library. Executor-side
/// failures never reach callers as this type; they are absorbed into a terminal
/// task status plus a log record.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "work_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Task lifecycle error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// The provider could not be resolved or constructed
    #[error("provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    /// The provider failed while producing data
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Export build or cache lookup failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid caller input
    #[error("validation error: {0}")]
    Validation(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Task lifecycle errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task does not exist (never created, or removed by the retention sweep)
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: TaskId,
    },

    /// Transition rejected because the task already reached a terminal status
    #[error("cannot move task {id} from {current} to {requested}")]
    InvalidTransition {
        /// The task ID whose transition was rejected
        id: TaskId,
        /// The status the task currently holds
        current: TaskStatus,
        /// The status that was requested
        requested: TaskStatus,
    },
}

/// Failure to resolve or construct a provider instance
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// No provider is registered under this identifier
    #[error("no provider registered as '{provider_id}'")]
    UnknownProvider {
        /// The identifier that was looked up
        provider_id: String,
    },

    /// The provider factory failed
    #[error("provider '{provider_id}' could not be constructed: {reason}")]
    ConstructionFailed {
        /// The identifier of the provider that failed
        provider_id: String,
        /// Why construction failed
        reason: String,
    },
}

/// Errors raised by a provider while producing a stream, or by the name resolver
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The upstream catalogue rejected or failed the query
    #[error("upstream query failed: {0}")]
    Upstream(String),

    /// The upstream response could not be interpreted
    #[error("malformed upstream data: {0}")]
    Malformed(String),

    /// An object name could not be resolved to a sky position
    #[error("could not resolve object '{name}': {reason}")]
    NameResolution {
        /// The object name that was looked up
        name: String,
        /// Why resolution failed
        reason: String,
    },

    /// The query passed to the provider is not one it can answer
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Export cache engine errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// No task IDs were supplied
    #[error("at least one task id is required")]
    EmptyTaskSet,

    /// Writing the zip archive failed
    #[error("failed to build archive {path}: {reason}")]
    Archive {
        /// The archive being written
        path: PathBuf,
        /// The reason the archive could not be written
        reason: String,
    },

    /// The cache index could not be consulted or updated
    #[error("export cache lookup failed: {0}")]
    CacheLookup(String),
}

/// Failure outcome of a bulk write
///
/// `TaskGone` is not a storage failure: the owning task was deleted while its
/// executor was still writing. Callers stop without a status write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The parent task no longer exists
    #[error("task {0} no longer exists")]
    TaskGone(TaskId),

    /// Any other storage failure
    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task error: task 0b6c... not found",
///     "details": {
///       "task_id": "0b6c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Export(ExportError::EmptyTaskSet) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Provisioning(ProvisioningError::UnknownProvider { .. }) => 404,

            // 409 Conflict - Task already terminal
            Error::Task(TaskError::InvalidTransition { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::Export(_) => 500,
            Error::Provisioning(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Provider(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidTransition { .. } => "invalid_transition",
            },
            Error::Provisioning(e) => match e {
                ProvisioningError::UnknownProvider { .. } => "unknown_provider",
                ProvisioningError::ConstructionFailed { .. } => "provisioning_failed",
            },
            Error::Provider(_) => "provider_error",
            Error::Export(e) => match e {
                ExportError::EmptyTaskSet => "empty_task_set",
                ExportError::Archive { .. } => "archive_failed",
                ExportError::CacheLookup(_) => "cache_lookup_failed",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation_error",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::InvalidTransition {
                id,
                current,
                requested,
            }) => Some(serde_json::json!({
                "task_id": id,
                "current_status": current,
                "requested_status": requested,
            })),
            Error::Provisioning(ProvisioningError::UnknownProvider { provider_id })
            | Error::Provisioning(ProvisioningError::ConstructionFailed { provider_id, .. }) => {
                Some(serde_json::json!({
                    "provider_id": provider_id,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        let id = TaskId::new();
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("work_dir".into()),
                },
                400,
                "config_error",
            ),
            (Error::Validation("no name".into()), 400, "validation_error"),
            (
                Error::Export(ExportError::EmptyTaskSet),
                400,
                "empty_task_set",
            ),
            (Error::NotFound("task".into()), 404, "not_found"),
            (
                Error::Task(TaskError::NotFound { id }),
                404,
                "task_not_found",
            ),
            (
                Error::Provisioning(ProvisioningError::UnknownProvider {
                    provider_id: "nope".into(),
                }),
                404,
                "unknown_provider",
            ),
            (
                Error::Task(TaskError::InvalidTransition {
                    id,
                    current: TaskStatus::Completed,
                    requested: TaskStatus::Failed,
                }),
                409,
                "invalid_transition",
            ),
            (
                Error::Database(DatabaseError::QueryFailed("timeout".into())),
                500,
                "database_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::Export(ExportError::Archive {
                    path: PathBuf::from("/tmp/a.zip"),
                    reason: "disk full".into(),
                }),
                500,
                "archive_failed",
            ),
            (
                Error::Export(ExportError::CacheLookup("locked".into())),
                500,
                "cache_lookup_failed",
            ),
            (
                Error::Provisioning(ProvisioningError::ConstructionFailed {
                    provider_id: "gaia".into(),
                    reason: "missing key".into(),
                }),
                500,
                "provisioning_failed",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
            (
                Error::Provider(ProviderError::Upstream("HTTP 500".into())),
                502,
                "provider_error",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, _, expected_code) in all_error_variants() {
            assert_eq!(error.error_code(), expected_code);
        }
    }

    #[test]
    fn task_not_found_carries_task_id_in_details() {
        let id = TaskId::new();
        let api: ApiError = Error::Task(TaskError::NotFound { id }).into();

        assert_eq!(api.error.code, "task_not_found");
        let details = api.error.details.expect("details present");
        assert_eq!(details["task_id"], id.to_string());
    }

    #[test]
    fn invalid_transition_details_name_both_statuses() {
        let id = TaskId::new();
        let api: ApiError = Error::Task(TaskError::InvalidTransition {
            id,
            current: TaskStatus::Completed,
            requested: TaskStatus::Failed,
        })
        .into();

        let details = api.error.details.unwrap();
        assert_eq!(details["current_status"], "completed");
        assert_eq!(details["requested_status"], "failed");
    }

    #[test]
    fn errors_without_context_have_no_details() {
        let api: ApiError = Error::ShuttingDown.into();
        assert!(api.error.details.is_none());

        let json = serde_json::to_value(&api).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn write_error_storage_wraps_database_error() {
        let err: WriteError = DatabaseError::QueryFailed("disk I/O error".into()).into();
        assert!(matches!(err, WriteError::Storage(_)));
        assert_eq!(err.to_string(), "query failed: disk I/O error");
    }
}
