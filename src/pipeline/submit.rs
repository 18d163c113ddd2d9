//! Request-path entry points: create the task, enqueue it, return.

use crate::error::{Error, Result};
use crate::types::{ObjectIdentifier, ProviderId, SkyPosition, TaskId, TaskQuery, TaskStatus};

use super::{TaskJob, TaskPipeline};

impl TaskPipeline {
    /// Submit a cone search around `position`
    ///
    /// `radius_arcsec` falls back to the configured default. Returns as soon
    /// as the task is recorded; the search runs in the background.
    ///
    /// An unknown `provider_id` is not rejected here: the task is created and
    /// later fails during execution.
    pub async fn submit_cone_search(
        &self,
        provider_id: ProviderId,
        position: SkyPosition,
        radius_arcsec: Option<f64>,
    ) -> Result<TaskId> {
        let radius_arcsec =
            radius_arcsec.unwrap_or(self.config.execution.default_search_radius_arcsec);
        if !radius_arcsec.is_finite() || radius_arcsec <= 0.0 {
            return Err(Error::Validation(format!(
                "search radius {radius_arcsec} must be a positive number of arcseconds"
            )));
        }

        self.submit(
            provider_id,
            TaskQuery::ConeSearch {
                position,
                radius_arcsec,
            },
        )
        .await
    }

    /// Submit a search for an object by name
    pub async fn submit_find_object(&self, provider_id: ProviderId, name: &str) -> Result<TaskId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("object name must not be empty".to_string()));
        }

        self.submit(
            provider_id,
            TaskQuery::FindObject {
                name: name.to_string(),
            },
        )
        .await
    }

    /// Submit retrieval of the photometric time series of `identifier`
    ///
    /// The identifier is re-tagged with `provider_id` so the series is
    /// always attributed to the provider that serves it.
    pub async fn submit_photometric_data(
        &self,
        provider_id: ProviderId,
        mut identifier: ObjectIdentifier,
    ) -> Result<TaskId> {
        identifier.provider_id = provider_id.clone();
        self.submit(provider_id, TaskQuery::PhotometricData { identifier })
            .await
    }

    async fn submit(&self, provider_id: ProviderId, query: TaskQuery) -> Result<TaskId> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let task_id = self.create_task(query.kind()).await?;

        let job = TaskJob {
            task_id,
            provider_id,
            query,
        };

        if self.dispatch.queue_tx.send(job).is_err() {
            // Dispatcher is gone; the task can never run
            tracing::error!(task_id = %task_id, "dispatch queue closed, failing task");
            if let Err(e) = self.transition(task_id, TaskStatus::Failed).await {
                tracing::warn!(task_id = %task_id, error = %e, "failed to mark undispatched task as failed");
            }
            return Err(Error::ShuttingDown);
        }

        tracing::debug!(task_id = %task_id, "task enqueued");
        Ok(task_id)
    }
}
