//! # astrocollector
//!
//! Asynchronous task pipeline for astronomical catalogue queries.
//!
//! A caller submits a query (a cone search, an object name to find, or an
//! identified object whose photometry to fetch) against a registered provider
//! and gets a task ID back at once. The query runs in the background: the
//! provider streams batches of results, each batch is written to SQLite as it
//! arrives, and the task ends `completed` or `failed`. Results of any set of
//! tasks can then be exported as a cached zip archive of CSV files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use astrocollector::provider::ProviderRegistry;
//! use astrocollector::types::{ProviderId, SkyPosition, TaskStatus};
//! use astrocollector::{Config, TaskPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ProviderRegistry::new();
//!     // registry.register_provider(...) for each catalogue
//!
//!     let pipeline = TaskPipeline::new(Config::default(), registry).await?;
//!     pipeline.start_services();
//!
//!     let task_id = pipeline
//!         .submit_cone_search(
//!             ProviderId::from("asas_sn"),
//!             SkyPosition::new(83.82, -5.39)?,
//!             None,
//!         )
//!         .await?;
//!
//!     while !pipeline.get_status(task_id).await?.is_terminal() {
//!         tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//!     }
//!     println!("{}", pipeline.get_status(task_id).await? == TaskStatus::Completed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Cached result exports
pub mod export;
/// Task lifecycle, dispatch and execution
pub mod pipeline;
/// Catalogue providers and their registry
pub mod provider;
/// Object name resolution
pub mod resolver;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, ExportError, ProviderError, ProvisioningError,
    Result, TaskError, ToHttpStatus, WriteError,
};
pub use pipeline::TaskPipeline;
pub use provider::{CatalogProvider, ProviderRegistry};
pub use resolver::{NameResolver, SesameResolver};
pub use types::{
    ExportMode, Measurement, ObjectIdentifier, ProviderDescriptor, ProviderId, SkyPosition,
    TaskId, TaskInfo, TaskKind, TaskStatus,
};

/// Helper function to run the pipeline with graceful signal handling.
///
/// Waits for a termination signal and then calls the pipeline's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use astrocollector::{Config, ProviderRegistry, TaskPipeline, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = TaskPipeline::new(Config::default(), ProviderRegistry::new()).await?;
///     pipeline.start_services();
///
///     // Run with automatic signal handling
///     run_with_shutdown(pipeline).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: TaskPipeline) -> Result<()> {
    wait_for_signal().await;
    pipeline.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
