//! Shared test helpers for creating TaskPipeline instances in tests.

use crate::config::Config;
use crate::pipeline::TaskPipeline;
use crate::provider::{FixtureProvider, ProviderRegistry};
use crate::resolver::StaticResolver;
use crate::types::{
    Measurement, ObjectIdentifier, ProviderDescriptor, ProviderId, SkyPosition, TaskId,
    TaskStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Provider ID used by the default fixture
pub(crate) const TEST_PROVIDER: &str = "fixture";

/// Test configuration rooted in `dir`
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.database_path = dir.join("test.db");
    config.storage.work_dir = dir.join("work");
    config.execution.max_concurrent_tasks = 2;
    config.execution.shutdown_timeout = Duration::from_secs(5);
    config.retention.enabled = false;
    config
}

/// Descriptor for a fixture provider
pub(crate) fn descriptor(id: &str, name: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderId::from(id),
        name: name.to_string(),
        description: format!("{name} test catalogue"),
        url: None,
        directly_identifies_objects: true,
    }
}

/// Identifier row `n` for `provider`
pub(crate) fn identifier(provider: &str, n: usize) -> ObjectIdentifier {
    ObjectIdentifier {
        provider_id: ProviderId::from(provider),
        ra_deg: 83.8 + n as f64 * 0.001,
        dec_deg: -5.39,
        name: Some(format!("OBJ {n}")),
        dist_arcsec: n as f64,
        extra: serde_json::Map::new(),
    }
}

/// Measurement row `n` for `provider`
pub(crate) fn measurement(provider: &str, n: usize) -> Measurement {
    Measurement {
        provider_id: ProviderId::from(provider),
        julian_date: 2459000.0 + n as f64,
        magnitude: 12.0,
        magnitude_error: 0.01,
        light_filter: Some("g".into()),
    }
}

/// Registry holding a single fixture provider under [`TEST_PROVIDER`]
pub(crate) fn registry_with(provider: FixtureProvider) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_provider(Arc::new(provider));
    registry
}

/// Fixture provider registered as [`TEST_PROVIDER`]
pub(crate) fn fixture() -> FixtureProvider {
    FixtureProvider::new(descriptor(TEST_PROVIDER, "Fixture Survey"))
}

/// Helper to create a test pipeline with a persistent database.
/// Returns the pipeline and the tempdir (which must be kept alive).
///
/// The name resolver knows only "M42". The dispatcher is not started.
pub(crate) async fn create_test_pipeline(
    registry: ProviderRegistry,
) -> (TaskPipeline, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());

    let resolver =
        StaticResolver::new().with("M42", SkyPosition::new(83.82, -5.39).unwrap());
    let pipeline = TaskPipeline::with_resolver(config, registry, Arc::new(resolver))
        .await
        .unwrap();

    (pipeline, temp_dir)
}

/// Poll until the task leaves `in_progress`
pub(crate) async fn wait_for_terminal(pipeline: &TaskPipeline, id: TaskId) -> TaskStatus {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let status = pipeline.get_status(id).await.unwrap();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish in time")
}
