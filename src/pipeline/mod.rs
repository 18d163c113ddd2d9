//! Task execution pipeline split into focused submodules.
//!
//! The `TaskPipeline` struct and its methods are organized by domain:
//! - [`lifecycle`] - Task creation, status transitions, shutdown
//! - [`submit`] - Request-path entry points for the three task kinds
//! - [`dispatcher`] - Background worker pool detaching execution from requests
//! - [`executor`] - Drives one provider stream into the bulk writer
//! - [`writer`] - Atomic batch appends with task-gone detection
//! - [`retention`] - Periodic deletion of old tasks and exports
//! - [`services`] - Background service starters

mod dispatcher;
mod executor;
mod lifecycle;
mod retention;
mod services;
mod submit;
mod writer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use retention::RetentionReport;
pub use writer::{BulkWriter, WriteAck};

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::export::ExportEngine;
use crate::provider::ProviderRegistry;
use crate::resolver::{NameResolver, SesameResolver};
use crate::types::{ProviderId, TaskId, TaskQuery};
use std::sync::Arc;

/// A submitted task waiting for (or holding) a worker slot
#[derive(Debug, Clone)]
pub(crate) struct TaskJob {
    pub(crate) task_id: TaskId,
    pub(crate) provider_id: ProviderId,
    pub(crate) query: TaskQuery,
}

/// Dispatch queue and worker state
#[derive(Clone)]
pub(crate) struct DispatchState {
    /// Sending half of the dispatch queue (request path only enqueues)
    pub(crate) queue_tx: tokio::sync::mpsc::UnboundedSender<TaskJob>,
    /// Receiving half, taken once by the dispatcher loop
    pub(crate) queue_rx:
        Arc<std::sync::Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<TaskJob>>>>,
    /// Semaphore limiting concurrent executions (respects max_concurrent_tasks)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Tasks currently executing; a task present here is never started again
    pub(crate) active_tasks: Arc<tokio::sync::Mutex<std::collections::HashSet<TaskId>>>,
    /// Flag to indicate whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<std::sync::atomic::AtomicBool>,
    /// Cancelled on shutdown to stop background loops
    pub(crate) shutdown: tokio_util::sync::CancellationToken,
}

/// Main pipeline instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TaskPipeline {
    /// Database instance for persistence
    /// Public for integration tests to inspect task rows
    pub db: Arc<Database>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Registered catalog providers
    pub(crate) providers: Arc<ProviderRegistry>,
    /// Object name resolver for find-object tasks
    pub(crate) resolver: Arc<dyn NameResolver>,
    /// Bulk writer shared by all executions
    pub(crate) writer: BulkWriter,
    /// Export cache engine
    pub(crate) exports: ExportEngine,
    /// Dispatch queue and worker state
    pub(crate) dispatch: DispatchState,
}

impl TaskPipeline {
    /// Create a new pipeline using the Sesame name resolver
    ///
    /// This initializes all core components:
    /// - Creates the working directories
    /// - Opens/creates the SQLite database and runs migrations
    /// - Fails tasks left `in_progress` by a previous process
    ///
    /// Background services are not started; call [`TaskPipeline::start_services`].
    pub async fn new(config: Config, providers: ProviderRegistry) -> Result<Self> {
        let resolver = Arc::new(SesameResolver::new(&config.resolver)?);
        Self::with_resolver(config, providers, resolver).await
    }

    /// Create a new pipeline with an explicit name resolver
    pub async fn with_resolver(
        config: Config,
        providers: ProviderRegistry,
        resolver: Arc<dyn NameResolver>,
    ) -> Result<Self> {
        config.validate()?;

        for dir in [config.raw_dir(), config.export_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        let db = Arc::new(
            Database::open(
                &config.storage.database_path,
                config.storage.max_connections,
            )
            .await?,
        );

        let interrupted = db.fail_interrupted_tasks().await?;
        if interrupted > 0 {
            tracing::warn!(
                count = interrupted,
                "Marked tasks left in progress by a previous run as failed"
            );
        }

        let config = Arc::new(config);
        let providers = Arc::new(providers);

        tracing::info!(
            providers = providers.len(),
            max_concurrent_tasks = config.execution.max_concurrent_tasks,
            "Task pipeline initialized"
        );

        let (queue_tx, queue_rx) = tokio::sync::mpsc::unbounded_channel();
        let dispatch = DispatchState {
            queue_tx,
            queue_rx: Arc::new(std::sync::Mutex::new(Some(queue_rx))),
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(
                config.execution.max_concurrent_tasks,
            )),
            active_tasks: Arc::new(tokio::sync::Mutex::new(std::collections::HashSet::new())),
            accepting_new: Arc::new(std::sync::atomic::AtomicBool::new(true)),
            shutdown: tokio_util::sync::CancellationToken::new(),
        };

        let exports = ExportEngine::new(Arc::clone(&db), Arc::clone(&providers), &config);

        Ok(Self {
            writer: BulkWriter::new(Arc::clone(&db)),
            db,
            config,
            providers,
            resolver,
            exports,
            dispatch,
        })
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Registered providers
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Export cache engine
    pub fn exports(&self) -> &ExportEngine {
        &self.exports
    }

    /// Object name resolver
    pub fn resolver(&self) -> Arc<dyn NameResolver> {
        Arc::clone(&self.resolver)
    }

    /// Path of the raw provider artifact for a task
    pub fn raw_artifact_path(&self, task_id: TaskId) -> std::path::PathBuf {
        self.config.raw_dir().join(format!("{}.csv", task_id))
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let pipeline = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(pipeline, config).await })
    }
}
