//! Bulk writer: persists provider batches inside the owning task's scope.

use crate::db::Database;
use crate::error::WriteError;
use crate::types::{Measurement, ObjectIdentifier, TaskId};
use std::sync::Arc;

/// Acknowledgement of a persisted batch
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    /// Rows appended by this write
    pub rows: usize,
}

/// Appends result batches as single atomic writes
///
/// A batch either lands completely or not at all. When the owning task has
/// been deleted the writer answers [`WriteError::TaskGone`], which callers
/// must treat as "stop quietly" rather than as a failure.
#[derive(Clone)]
pub struct BulkWriter {
    db: Arc<Database>,
}

impl BulkWriter {
    /// Create a writer over a database handle
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist a batch of identifier rows
    pub async fn write_identifiers(
        &self,
        task_id: TaskId,
        rows: &[ObjectIdentifier],
    ) -> Result<WriteAck, WriteError> {
        if rows.is_empty() {
            return Ok(WriteAck { rows: 0 });
        }

        self.db.insert_identifiers(task_id, rows).await?;
        tracing::debug!(task_id = %task_id, rows = rows.len(), "persisted identifier batch");
        Ok(WriteAck { rows: rows.len() })
    }

    /// Persist a batch of measurement rows
    pub async fn write_measurements(
        &self,
        task_id: TaskId,
        rows: &[Measurement],
    ) -> Result<WriteAck, WriteError> {
        if rows.is_empty() {
            return Ok(WriteAck { rows: 0 });
        }

        self.db.insert_measurements(task_id, rows).await?;
        tracing::debug!(task_id = %task_id, rows = rows.len(), "persisted measurement batch");
        Ok(WriteAck { rows: rows.len() })
    }
}
