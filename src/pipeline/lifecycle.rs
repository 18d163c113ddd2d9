//! Task lifecycle and shutdown coordination.

use crate::error::{Error, Result, TaskError};
use crate::types::{TaskId, TaskInfo, TaskKind, TaskStatus};

use super::TaskPipeline;

impl TaskPipeline {
    /// Create a task in the `in_progress` status
    pub async fn create_task(&self, kind: TaskKind) -> Result<TaskId> {
        let id = TaskId::new();
        self.db.insert_task(id, kind).await?;
        tracing::info!(task_id = %id, kind = ?kind, "task created");
        Ok(id)
    }

    /// Move a task to a terminal status
    ///
    /// Performed as one conditional write. A task that is already terminal is
    /// left untouched and reported as [`TaskError::InvalidTransition`]; a task
    /// that no longer exists is reported as [`TaskError::NotFound`].
    pub async fn transition(&self, id: TaskId, outcome: TaskStatus) -> Result<()> {
        if !TaskStatus::InProgress.can_transition_to(outcome) {
            return Err(Error::Task(TaskError::InvalidTransition {
                id,
                current: TaskStatus::InProgress,
                requested: outcome,
            }));
        }

        if self.db.finish_task(id, outcome).await? {
            tracing::info!(task_id = %id, status = %outcome, "task finished");
            return Ok(());
        }

        // Nothing matched; read back only to report why
        match self.db.get_task_status(id).await? {
            None => Err(Error::Task(TaskError::NotFound { id })),
            Some(current) => Err(Error::Task(TaskError::InvalidTransition {
                id,
                current,
                requested: outcome,
            })),
        }
    }

    /// Current status of a task
    ///
    /// `NotFound` is expected for tasks removed by the retention sweep.
    pub async fn get_status(&self, id: TaskId) -> Result<TaskStatus> {
        self.db
            .get_task_status(id)
            .await?
            .ok_or(Error::Task(TaskError::NotFound { id }))
    }

    /// Full task record
    pub async fn get_task(&self, id: TaskId) -> Result<TaskInfo> {
        self.db
            .get_task(id)
            .await?
            .map(TaskInfo::from)
            .ok_or(Error::Task(TaskError::NotFound { id }))
    }

    /// Delete a task, its result rows and its raw artifact
    ///
    /// An execution still running for the task stops at its next write.
    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        if !self.db.delete_task(id).await? {
            return Err(Error::Task(TaskError::NotFound { id }));
        }
        self.remove_raw_artifact(id).await;
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Remove a task's raw artifact if it exists
    pub(crate) async fn remove_raw_artifact(&self, id: TaskId) {
        let path = self.raw_artifact_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(task_id = %id, "removed raw artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(task_id = %id, path = %path.display(), error = %e, "failed to remove raw artifact")
            }
        }
    }

    /// Whether new submissions are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.dispatch
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Gracefully shut down the pipeline
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops the dispatcher and retention loops
    /// 3. Waits for executing tasks to finish, bounded by `shutdown_timeout`
    ///
    /// Tasks still queued or executing after the timeout stay `in_progress`
    /// and are failed when the next pipeline opens the database.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.dispatch
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        self.dispatch.shutdown.cancel();

        let shutdown_timeout = self.config.execution.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.wait_for_active_tasks()).await {
            Ok(()) => tracing::info!("All executing tasks finished"),
            Err(_) => tracing::warn!(
                "Timeout waiting for executing tasks to finish, proceeding with shutdown"
            ),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Wait until no task is executing
    pub(crate) async fn wait_for_active_tasks(&self) {
        loop {
            let active_count = self.dispatch.active_tasks.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for executing tasks to finish");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
