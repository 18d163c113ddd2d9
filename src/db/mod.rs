//! Database layer for astrocollector
//!
//! Handles SQLite persistence for tasks, their result rows and the export
//! cache index.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task records and status transitions
//! - [`results`] - Bulk ingestion and paged reads of result rows
//! - [`exports`] - Export artifact cache index

use crate::types::{Measurement, ProviderId, TaskId, TaskInfo, TaskKind, TaskStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod exports;
mod migrations;
mod results;
mod tasks;

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Task identifier
    pub id: TaskId,
    /// Task kind code (see [`TaskKind::to_i32`])
    pub kind: i32,
    /// Status code (see [`TaskStatus::to_i32`])
    pub status: i32,
    /// Unix timestamp when the task was created
    pub created_at: i64,
    /// Unix timestamp of the terminal transition
    pub finished_at: Option<i64>,
}

impl From<TaskRow> for TaskInfo {
    fn from(row: TaskRow) -> Self {
        TaskInfo {
            id: row.id,
            kind: TaskKind::from_i32(row.kind),
            status: TaskStatus::from_i32(row.status),
            created_at: DateTime::<Utc>::from_timestamp(row.created_at, 0).unwrap_or_default(),
        }
    }
}

/// Measurement record from database
#[derive(Debug, Clone, FromRow)]
pub struct MeasurementRow {
    /// Row ID, increasing in insertion order
    pub id: i64,
    /// Owning task
    pub task_id: TaskId,
    /// Provider that produced the measurement
    pub provider_id: String,
    /// Barycentric Julian date
    pub julian_date: f64,
    /// Magnitude
    pub magnitude: f64,
    /// Magnitude uncertainty
    pub magnitude_error: f64,
    /// Filter label
    pub light_filter: Option<String>,
}

impl From<MeasurementRow> for Measurement {
    fn from(row: MeasurementRow) -> Self {
        Measurement {
            provider_id: ProviderId(row.provider_id),
            julian_date: row.julian_date,
            magnitude: row.magnitude,
            magnitude_error: row.magnitude_error,
            light_filter: row.light_filter,
        }
    }
}

/// Export cache index record from database
#[derive(Debug, Clone, FromRow)]
pub struct ExportArtifact {
    /// Unique database ID
    pub id: i64,
    /// SHA-256 hex digest of the canonical (task set, mode) key
    pub task_set_hash: String,
    /// Archive file name inside the export directory
    pub file_name: String,
    /// Export mode (see [`crate::types::ExportMode::as_str`])
    pub mode: String,
    /// Unix timestamp when the archive was built
    pub created_at: i64,
}

/// Database handle for astrocollector
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
