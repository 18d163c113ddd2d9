//! Task records and status transitions.

use crate::error::DatabaseError;
use crate::types::{TaskId, TaskKind, TaskStatus};
use crate::{Error, Result};

use super::{Database, TaskRow};

impl Database {
    /// Insert a new task in the `in_progress` status
    pub async fn insert_task(&self, id: TaskId, kind: TaskKind) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO tasks (id, kind, status, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(kind.to_i32())
        .bind(TaskStatus::InProgress.to_i32())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert task: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, kind, status, created_at, finished_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get only the status of a task
    pub async fn get_task_status(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        let status: Option<i32> = sqlx::query_scalar("SELECT status FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get task status: {}",
                    e
                )))
            })?;

        Ok(status.map(TaskStatus::from_i32))
    }

    /// Move a task out of `in_progress` in a single conditional write
    ///
    /// Returns `false` when no row matched: the task is gone or already
    /// terminal. The row is never touched in that case.
    pub async fn finish_task(&self, id: TaskId, status: TaskStatus) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, finished_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.to_i32())
        .bind(now)
        .bind(id)
        .bind(TaskStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task status: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Fail every task still `in_progress`
    ///
    /// Used at startup: executions do not survive a restart, so those tasks
    /// would otherwise stay `in_progress` forever.
    pub async fn fail_interrupted_tasks(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE tasks SET status = ?, finished_at = ? WHERE status = ?")
            .bind(TaskStatus::Failed.to_i32())
            .bind(now)
            .bind(TaskStatus::InProgress.to_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to fail interrupted tasks: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Delete a task; result rows go with it
    ///
    /// Returns whether a task was deleted.
    pub async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete task: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every task created before `cutoff` (unix seconds)
    ///
    /// Returns the IDs of the deleted tasks so their files can be removed.
    pub async fn delete_tasks_before(&self, cutoff: i64) -> Result<Vec<TaskId>> {
        let ids: Vec<TaskId> =
            sqlx::query_scalar("DELETE FROM tasks WHERE created_at < ? RETURNING id")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete expired tasks: {}",
                        e
                    )))
                })?;

        Ok(ids)
    }

    /// Count tasks in a given status
    pub async fn count_tasks_by_status(&self, status: TaskStatus) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = ?")
            .bind(status.to_i32())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count tasks: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}
