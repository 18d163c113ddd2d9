//! Export artifact cache index.

use crate::error::DatabaseError;
use crate::types::ExportMode;
use crate::{Error, Result};

use super::{Database, ExportArtifact};

impl Database {
    /// Look up the cache record for a task-set hash
    ///
    /// Duplicates are tolerated; the oldest record wins.
    pub async fn find_export_by_hash(&self, task_set_hash: &str) -> Result<Option<ExportArtifact>> {
        let row = sqlx::query_as::<_, ExportArtifact>(
            r#"
            SELECT id, task_set_hash, file_name, mode, created_at
            FROM export_artifacts
            WHERE task_set_hash = ?
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(task_set_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to look up export: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Record a freshly built archive
    pub async fn insert_export(
        &self,
        task_set_hash: &str,
        file_name: &str,
        mode: ExportMode,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO export_artifacts (task_set_hash, file_name, mode, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(task_set_hash)
        .bind(file_name)
        .bind(mode.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert export: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Delete a single cache record
    pub async fn delete_export(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM export_artifacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete export: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Delete cache records created before `cutoff` (unix seconds)
    ///
    /// Returns the deleted records so their archives can be removed.
    pub async fn delete_exports_before(&self, cutoff: i64) -> Result<Vec<ExportArtifact>> {
        let rows = sqlx::query_as::<_, ExportArtifact>(
            r#"
            DELETE FROM export_artifacts
            WHERE created_at < ?
            RETURNING id, task_set_hash, file_name, mode, created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to delete expired exports: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
