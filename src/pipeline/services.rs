//! Background service starters: dispatcher and retention sweep.

use super::TaskPipeline;

impl TaskPipeline {
    /// Start every background service the configuration enables
    ///
    /// The dispatcher always runs; without it submitted tasks never execute.
    pub fn start_services(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = vec![self.start_dispatcher()];

        if self.config.retention.enabled {
            handles.push(self.start_retention_sweep());
            tracing::info!(
                max_age_secs = self.config.retention.max_age.as_secs(),
                interval_secs = self.config.retention.sweep_interval.as_secs(),
                "Retention sweep background task started"
            );
        } else {
            tracing::info!("Retention disabled, skipping sweep task");
        }

        handles
    }
}
