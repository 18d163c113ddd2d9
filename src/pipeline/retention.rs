//! Retention sweep: deletes old tasks, their raw artifacts, and old export archives.

use crate::error::Result;

use super::TaskPipeline;

/// Counts of what a single sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Tasks deleted (their result rows go with them)
    pub tasks_deleted: usize,
    /// Export records deleted along with their archives
    pub exports_deleted: usize,
}

impl TaskPipeline {
    /// Run one retention sweep now
    ///
    /// Runs alongside in-flight executions. An execution whose task is removed
    /// here stops quietly at its next write.
    pub async fn run_retention_sweep(&self) -> Result<RetentionReport> {
        let max_age_secs = i64::try_from(self.config.retention.max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now().timestamp().saturating_sub(max_age_secs);

        let task_ids = self.db.delete_tasks_before(cutoff).await?;
        for id in &task_ids {
            self.remove_raw_artifact(*id).await;
        }

        let exports = self.db.delete_exports_before(cutoff).await?;
        for artifact in &exports {
            let path = self.exports.archive_path(&artifact.file_name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove expired export archive")
                }
            }
        }

        let report = RetentionReport {
            tasks_deleted: task_ids.len(),
            exports_deleted: exports.len(),
        };

        if report.tasks_deleted > 0 || report.exports_deleted > 0 {
            tracing::info!(
                tasks_deleted = report.tasks_deleted,
                exports_deleted = report.exports_deleted,
                "retention sweep removed expired data"
            );
        } else {
            tracing::debug!("retention sweep found nothing to remove");
        }

        Ok(report)
    }

    /// Start the periodic retention sweep
    ///
    /// The first sweep runs immediately. Errors are logged and the loop keeps
    /// going; it stops when the pipeline shuts down.
    pub fn start_retention_sweep(&self) -> tokio::task::JoinHandle<()> {
        let pipeline = self.clone();
        let shutdown = self.dispatch.shutdown.clone();
        let period = self.config.retention.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = pipeline.run_retention_sweep().await {
                            tracing::error!(error = %e, "retention sweep failed");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("Retention sweep stopped");
                        break;
                    }
                }
            }
        })
    }
}
