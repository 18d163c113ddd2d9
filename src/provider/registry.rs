//! Explicit provider registration table

use super::CatalogProvider;
use crate::error::ProvisioningError;
use crate::types::{ProviderDescriptor, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

type ProviderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn CatalogProvider>, String> + Send + Sync + 'static>;

struct RegistryEntry {
    descriptor: ProviderDescriptor,
    factory: ProviderFactory,
}

/// Maps provider identifiers to provider constructors
///
/// Populated once at startup and shared read-only afterwards. Resolution runs
/// the factory each time, so a provider that cannot currently be built fails
/// only the tasks that need it.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<ProviderId, RegistryEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already constructed provider under its descriptor's ID
    ///
    /// Replaces any provider previously registered under the same ID.
    pub fn register_provider(&mut self, provider: Arc<dyn CatalogProvider>) {
        let descriptor = provider.descriptor();
        self.register_factory(descriptor, move || Ok(Arc::clone(&provider)));
    }

    /// Register a constructor invoked on every resolution
    pub fn register_factory<F>(&mut self, descriptor: ProviderDescriptor, factory: F)
    where
        F: Fn() -> Result<Arc<dyn CatalogProvider>, String> + Send + Sync + 'static,
    {
        let id = descriptor.id.clone();
        if self.entries.contains_key(&id) {
            tracing::warn!(provider_id = %id, "replacing registered provider");
        }
        self.entries.insert(
            id,
            RegistryEntry {
                descriptor,
                factory: Arc::new(factory),
            },
        );
    }

    /// Obtain a provider instance
    pub fn resolve(&self, id: &ProviderId) -> Result<Arc<dyn CatalogProvider>, ProvisioningError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| ProvisioningError::UnknownProvider {
                provider_id: id.to_string(),
            })?;

        (entry.factory)().map_err(|reason| ProvisioningError::ConstructionFailed {
            provider_id: id.to_string(),
            reason,
        })
    }

    /// Descriptor of a registered provider
    pub fn descriptor(&self, id: &ProviderId) -> Option<&ProviderDescriptor> {
        self.entries.get(id).map(|entry| &entry.descriptor)
    }

    /// Display name for a provider, falling back to its ID when unregistered
    pub fn display_name(&self, id: &ProviderId) -> String {
        self.descriptor(id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// All registered descriptors, ordered by ID
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut all: Vec<_> = self
            .entries
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no providers are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish()
    }
}
