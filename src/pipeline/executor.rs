//! Streaming query executor.
//!
//! Drives one provider stream to its end, handing each batch to the bulk
//! writer, then records the task's terminal status. Every failure is absorbed
//! here into a status plus a log record; nothing propagates to the caller.

use crate::error::{DatabaseError, Error, ProviderError, ProvisioningError, TaskError, WriteError};
use crate::provider::BatchStream;
use crate::types::{ProviderId, TaskId, TaskQuery, TaskStatus};
use futures::StreamExt;
use std::future::Future;

use super::{TaskJob, TaskPipeline, WriteAck};

/// Why an execution stopped before the stream was exhausted
#[derive(Debug, thiserror::Error)]
enum ExecutionError {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(DatabaseError),

    #[error("task was deleted during execution")]
    TaskGone,
}

impl From<WriteError> for ExecutionError {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::TaskGone(_) => ExecutionError::TaskGone,
            WriteError::Storage(e) => ExecutionError::Storage(e),
        }
    }
}

impl TaskPipeline {
    /// Run one job to completion and record its outcome
    pub(crate) async fn execute_task(&self, job: TaskJob) {
        let TaskJob {
            task_id,
            provider_id,
            query,
        } = job;

        tracing::info!(task_id = %task_id, provider_id = %provider_id, kind = ?query.kind(), "executing task");

        match self.run_query(task_id, &provider_id, &query).await {
            Ok(rows) => {
                tracing::info!(task_id = %task_id, rows, "provider stream exhausted");
                self.finish(task_id, TaskStatus::Completed).await;
            }
            Err(ExecutionError::TaskGone) => {
                tracing::warn!(task_id = %task_id, "task deleted during execution, stopping");
            }
            Err(ExecutionError::Provisioning(e)) => {
                tracing::error!(task_id = %task_id, provider_id = %provider_id, query = ?query, error = %e, "provider provisioning failed");
                self.finish(task_id, TaskStatus::Failed).await;
            }
            Err(ExecutionError::Provider(e)) => {
                tracing::error!(task_id = %task_id, provider_id = %provider_id, error = %e, "provider failed");
                self.finish(task_id, TaskStatus::Failed).await;
            }
            Err(ExecutionError::Storage(e)) => {
                tracing::error!(task_id = %task_id, error = ?e, "failed to persist results");
                self.finish(task_id, TaskStatus::Failed).await;
            }
        }
    }

    async fn run_query(
        &self,
        task_id: TaskId,
        provider_id: &ProviderId,
        query: &TaskQuery,
    ) -> Result<usize, ExecutionError> {
        let provider = self.providers.resolve(provider_id)?;
        let limit = provider.batch_limit();

        match query {
            TaskQuery::ConeSearch {
                position,
                radius_arcsec,
            } => {
                let stream = provider.search(*position, *radius_arcsec, provider_id.clone());
                self.ingest(task_id, limit, stream, |rows| {
                    let writer = self.writer.clone();
                    async move { writer.write_identifiers(task_id, &rows).await }
                })
                .await
            }
            TaskQuery::FindObject { name } => {
                let position = self.resolver.resolve(name).await?;
                tracing::debug!(task_id = %task_id, object = %name, ra_deg = position.ra_deg, dec_deg = position.dec_deg, "resolved object name");

                let radius = self.config.execution.default_search_radius_arcsec;
                let stream = provider.search(position, radius, provider_id.clone());
                self.ingest(task_id, limit, stream, |rows| {
                    let writer = self.writer.clone();
                    async move { writer.write_identifiers(task_id, &rows).await }
                })
                .await
            }
            TaskQuery::PhotometricData { identifier } => {
                let stream =
                    provider.fetch_series(identifier.clone(), self.raw_artifact_path(task_id));
                self.ingest(task_id, limit, stream, |rows| {
                    let writer = self.writer.clone();
                    async move { writer.write_measurements(task_id, &rows).await }
                })
                .await
            }
        }
    }

    /// Pull batches in stream order, writing each before pulling the next
    async fn ingest<T, F, Fut>(
        &self,
        task_id: TaskId,
        batch_limit: usize,
        mut stream: BatchStream<T>,
        mut write: F,
    ) -> Result<usize, ExecutionError>
    where
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<WriteAck, WriteError>>,
    {
        let mut total = 0usize;
        let mut batches = 0usize;

        while let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.len() > batch_limit {
                tracing::warn!(task_id = %task_id, rows = batch.len(), batch_limit, "provider exceeded its batch limit");
            }

            let ack = write(batch).await?;
            total += ack.rows;
            batches += 1;
        }

        tracing::debug!(task_id = %task_id, batches, rows = total, "ingestion finished");
        Ok(total)
    }

    /// Record the terminal status, tolerating a task swept mid-run
    async fn finish(&self, task_id: TaskId, status: TaskStatus) {
        match self.transition(task_id, status).await {
            Ok(()) => {}
            Err(Error::Task(TaskError::NotFound { .. })) => {
                tracing::warn!(task_id = %task_id, "task deleted before its status could be recorded");
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, status = %status, error = %e, "failed to record task status");
            }
        }
    }
}
