//! In-memory provider serving canned batches

use super::{BatchStream, CatalogProvider, DEFAULT_BATCH_LIMIT};
use crate::error::ProviderError;
use crate::types::{Measurement, ObjectIdentifier, ProviderDescriptor, ProviderId, SkyPosition};
use futures::{StreamExt, TryStreamExt, stream};
use std::path::PathBuf;
use std::time::Duration;

/// Provider that replays preconfigured batches
///
/// Used for demos and tests, and as a stand-in while a real catalogue
/// integration is unavailable. Every query returns the same batches; identity
/// fields (`provider_id`) are rewritten to match the query.
///
/// # Examples
///
/// ```
/// use astrocollector::provider::{CatalogProvider, FixtureProvider};
/// use astrocollector::types::{ProviderDescriptor, ProviderId, SkyPosition};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = FixtureProvider::new(ProviderDescriptor {
///     id: ProviderId::from("empty"),
///     name: "Empty".into(),
///     description: String::new(),
///     url: None,
///     directly_identifies_objects: false,
/// });
///
/// let position = SkyPosition { ra_deg: 10.0, dec_deg: 20.0 };
/// let batches: Vec<_> = provider
///     .search(position, 30.0, ProviderId::from("empty"))
///     .collect()
///     .await;
/// assert!(batches.is_empty());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    descriptor: ProviderDescriptor,
    batch_limit: usize,
    search_batches: Vec<Vec<ObjectIdentifier>>,
    series_batches: Vec<Vec<Measurement>>,
    failure: Option<(usize, ProviderError)>,
    raw_artifact: Option<String>,
    batch_delay: Option<Duration>,
}

impl FixtureProvider {
    /// Create a provider that yields nothing
    pub fn new(descriptor: ProviderDescriptor) -> Self {
        Self {
            descriptor,
            batch_limit: DEFAULT_BATCH_LIMIT,
            search_batches: Vec::new(),
            series_batches: Vec::new(),
            failure: None,
            raw_artifact: None,
            batch_delay: None,
        }
    }

    /// Batches returned by [`CatalogProvider::search`]
    pub fn with_search_batches(mut self, batches: Vec<Vec<ObjectIdentifier>>) -> Self {
        self.search_batches = batches;
        self
    }

    /// Batches returned by [`CatalogProvider::fetch_series`]
    pub fn with_series_batches(mut self, batches: Vec<Vec<Measurement>>) -> Self {
        self.series_batches = batches;
        self
    }

    /// Yield `error` in place of the batch at index `at`, ending the stream
    pub fn failing_at(mut self, at: usize, error: ProviderError) -> Self {
        self.failure = Some((at, error));
        self
    }

    /// Text written to the raw artifact path before the first series batch
    pub fn with_raw_artifact(mut self, content: impl Into<String>) -> Self {
        self.raw_artifact = Some(content.into());
        self
    }

    /// Sleep before yielding each batch
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    /// Advertised batch limit
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    fn replay<T: Send + 'static>(&self, batches: Vec<Vec<T>>) -> BatchStream<T> {
        let mut items: Vec<Result<Vec<T>, ProviderError>> = batches.into_iter().map(Ok).collect();
        if let Some((at, error)) = &self.failure {
            items.truncate(*at);
            items.push(Err(error.clone()));
        }

        let delay = self.batch_delay;
        stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed()
    }
}

impl CatalogProvider for FixtureProvider {
    fn descriptor(&self) -> ProviderDescriptor {
        self.descriptor.clone()
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    fn search(
        &self,
        _position: SkyPosition,
        _radius_arcsec: f64,
        provider_id: ProviderId,
    ) -> BatchStream<ObjectIdentifier> {
        let batches = self
            .search_batches
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .cloned()
                    .map(|mut ident| {
                        ident.provider_id = provider_id.clone();
                        ident
                    })
                    .collect()
            })
            .collect();
        self.replay(batches)
    }

    fn fetch_series(
        &self,
        identifier: ObjectIdentifier,
        raw_artifact: PathBuf,
    ) -> BatchStream<Measurement> {
        let batches = self
            .series_batches
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .cloned()
                    .map(|mut m| {
                        m.provider_id = identifier.provider_id.clone();
                        m
                    })
                    .collect()
            })
            .collect();
        let replay = self.replay(batches);

        let Some(content) = self.raw_artifact.clone() else {
            return replay;
        };

        stream::once(async move {
            tokio::fs::write(&raw_artifact, content)
                .await
                .map_err(|e| {
                    ProviderError::Upstream(format!(
                        "failed to save raw response to {}: {}",
                        raw_artifact.display(),
                        e
                    ))
                })?;
            Ok::<_, ProviderError>(replay)
        })
        .try_flatten()
        .boxed()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor {
            id: ProviderId::from("fixture"),
            name: "Fixture".into(),
            description: String::new(),
            url: None,
            directly_identifies_objects: true,
        }
    }

    fn identifier(provider: &str) -> ObjectIdentifier {
        ObjectIdentifier {
            provider_id: ProviderId::from(provider),
            ra_deg: 1.0,
            dec_deg: 2.0,
            name: None,
            dist_arcsec: 0.0,
            extra: serde_json::Map::new(),
        }
    }

    fn measurement(jd: f64) -> Measurement {
        Measurement {
            provider_id: ProviderId::from("placeholder"),
            julian_date: jd,
            magnitude: 10.0,
            magnitude_error: 0.1,
            light_filter: None,
        }
    }

    #[tokio::test]
    async fn search_rewrites_provider_id() {
        let provider = FixtureProvider::new(descriptor())
            .with_search_batches(vec![vec![identifier("other"), identifier("other")]]);

        let batches: Vec<_> = provider
            .search(
                SkyPosition {
                    ra_deg: 0.0,
                    dec_deg: 0.0,
                },
                30.0,
                ProviderId::from("fixture"),
            )
            .collect()
            .await;

        assert_eq!(batches.len(), 1);
        let batch = batches.into_iter().next().unwrap().unwrap();
        assert!(batch.iter().all(|i| i.provider_id.as_str() == "fixture"));
    }

    #[tokio::test]
    async fn failure_replaces_batch_and_ends_stream() {
        let provider = FixtureProvider::new(descriptor())
            .with_series_batches(vec![vec![measurement(1.0)], vec![measurement(2.0)], vec![
                measurement(3.0),
            ]])
            .failing_at(1, ProviderError::Upstream("HTTP 503".into()));

        let dir = tempfile::tempdir().unwrap();
        let items: Vec<_> = provider
            .fetch_series(identifier("fixture"), dir.path().join("x.csv"))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn raw_artifact_written_before_first_batch() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("task.csv");
        let provider = FixtureProvider::new(descriptor())
            .with_series_batches(vec![vec![measurement(1.0)]])
            .with_raw_artifact("hjd,mag\n1.0,10.0\n");

        let mut stream = provider.fetch_series(identifier("fixture"), raw.clone());
        let first = stream.next().await.unwrap().unwrap();

        assert_eq!(first[0].provider_id.as_str(), "fixture");
        assert_eq!(
            std::fs::read_to_string(&raw).unwrap(),
            "hjd,mag\n1.0,10.0\n"
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn nothing_happens_until_polled() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("lazy.csv");
        let provider = FixtureProvider::new(descriptor()).with_raw_artifact("data");

        let stream = provider.fetch_series(identifier("fixture"), raw.clone());
        assert!(!raw.exists());
        drop(stream);
        assert!(!raw.exists());
    }
}
