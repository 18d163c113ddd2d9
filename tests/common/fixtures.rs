//! Providers, configuration and result rows for integration tests

use astrocollector::provider::FixtureProvider;
use astrocollector::resolver::StaticResolver;
use astrocollector::{
    Config, Measurement, ObjectIdentifier, ProviderDescriptor, ProviderId, ProviderRegistry,
    SkyPosition, TaskPipeline,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Position of the Orion Nebula
pub fn orion() -> SkyPosition {
    SkyPosition::new(83.82, -5.39).unwrap()
}

/// Configuration rooted in `dir` with background retention off
pub fn config_in(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.database_path = dir.join("astro.db");
    config.storage.work_dir = dir.join("work");
    config.execution.max_concurrent_tasks = 4;
    config.execution.shutdown_timeout = Duration::from_secs(5);
    config.retention.enabled = false;
    config
}

/// Descriptor for a test survey
pub fn survey(id: &str, name: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderId::from(id),
        name: name.to_string(),
        description: format!("{name} (test double)"),
        url: Some(format!("https://{id}.example.org")),
        directly_identifies_objects: true,
    }
}

/// `count` identifiers from `provider`, nearest first
pub fn identifiers(provider: &str, count: usize) -> Vec<ObjectIdentifier> {
    (0..count)
        .map(|n| {
            let mut extra = serde_json::Map::new();
            extra.insert("catalog_id".into(), serde_json::json!(format!("{provider}-{n}")));
            ObjectIdentifier {
                provider_id: ProviderId::from(provider),
                ra_deg: 83.82 + n as f64 * 0.0005,
                dec_deg: -5.39,
                name: Some(format!("{provider} J{n:04}")),
                dist_arcsec: n as f64 * 1.5,
                extra,
            }
        })
        .collect()
}

/// `count` measurements from `provider` in time order
pub fn series(provider: &str, count: usize) -> Vec<Measurement> {
    (0..count)
        .map(|n| Measurement {
            provider_id: ProviderId::from(provider),
            julian_date: 2_459_000.5 + n as f64 * 0.25,
            magnitude: 11.0 + (n % 3) as f64 * 0.1,
            magnitude_error: 0.02,
            light_filter: Some("V".to_string()),
        })
        .collect()
}

/// Start a pipeline over `registry` whose name resolver knows "M42"
pub async fn start_pipeline(
    registry: ProviderRegistry,
    dir: &TempDir,
) -> Arc<TaskPipeline> {
    let resolver = StaticResolver::new().with("M42", orion());
    let pipeline = TaskPipeline::with_resolver(config_in(dir.path()), registry, Arc::new(resolver))
        .await
        .expect("pipeline should start");
    pipeline.start_services();
    Arc::new(pipeline)
}

/// Registry with one fixture provider
pub fn registry_of(provider: FixtureProvider) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_provider(Arc::new(provider));
    registry
}
