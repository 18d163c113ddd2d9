//! Catalog provider contract
//!
//! A provider answers two kinds of query, each as a lazy, finite,
//! non-restartable stream of bounded batches:
//!
//! - [`CatalogProvider::search`] lists objects around a sky position
//! - [`CatalogProvider::fetch_series`] retrieves the photometric time series of
//!   one previously identified object
//!
//! Providers are compiled types registered in a [`ProviderRegistry`] at
//! startup. An empty stream means "nothing found" and is not an error; an
//! `Err` item aborts the stream and fails the task.
//!
//! ## Usage
//!
//! ```
//! use astrocollector::provider::{FixtureProvider, ProviderRegistry};
//! use astrocollector::types::{ProviderDescriptor, ProviderId};
//! use std::sync::Arc;
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register_provider(Arc::new(FixtureProvider::new(ProviderDescriptor {
//!     id: ProviderId::from("demo"),
//!     name: "Demo Survey".into(),
//!     description: String::new(),
//!     url: None,
//!     directly_identifies_objects: true,
//! })));
//!
//! assert!(registry.resolve(&ProviderId::from("demo")).is_ok());
//! assert!(registry.resolve(&ProviderId::from("missing")).is_err());
//! ```

use crate::error::ProviderError;
use crate::types::{Measurement, ObjectIdentifier, ProviderDescriptor, ProviderId, SkyPosition};
use futures::stream::BoxStream;
use std::path::PathBuf;

mod fixture;
mod registry;

pub use fixture::FixtureProvider;
pub use registry::ProviderRegistry;

/// Batch size providers use unless they say otherwise
pub const DEFAULT_BATCH_LIMIT: usize = 20_000;

/// A stream of result batches produced by a provider
pub type BatchStream<T> = BoxStream<'static, Result<Vec<T>, ProviderError>>;

/// Trait implemented by every catalog provider
///
/// Both query methods return immediately; no work happens until the returned
/// stream is polled. Each yielded batch holds at most [`batch_limit`] items and
/// batches arrive in the order they must be stored.
///
/// [`batch_limit`]: CatalogProvider::batch_limit
pub trait CatalogProvider: Send + Sync {
    /// Static description used in listings and export file names
    fn descriptor(&self) -> ProviderDescriptor;

    /// Upper bound on the length of any yielded batch
    fn batch_limit(&self) -> usize {
        DEFAULT_BATCH_LIMIT
    }

    /// List objects within `radius_arcsec` of `position`
    ///
    /// Every yielded identifier carries `provider_id`.
    fn search(
        &self,
        position: SkyPosition,
        radius_arcsec: f64,
        provider_id: ProviderId,
    ) -> BatchStream<ObjectIdentifier>;

    /// Retrieve the time series of `identifier`
    ///
    /// The provider may save its unprocessed upstream response to
    /// `raw_artifact`; that file is what raw-bundle exports package.
    fn fetch_series(
        &self,
        identifier: ObjectIdentifier,
        raw_artifact: PathBuf,
    ) -> BatchStream<Measurement>;
}
