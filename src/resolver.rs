//! Object name resolution
//!
//! "Find object" tasks start from a name such as `"M31"` or `"V* RR Lyr"`.
//! A [`NameResolver`] turns that name into a [`SkyPosition`] before the cone
//! search runs. [`SesameResolver`] asks the CDS Sesame service.

use crate::config::ResolverConfig;
use crate::error::{Error, ProviderError, Result};
use crate::types::SkyPosition;
use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

/// Resolves object names to sky positions
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `name`, failing with [`ProviderError::NameResolution`] when the
    /// service does not know it
    async fn resolve(&self, name: &str) -> std::result::Result<SkyPosition, ProviderError>;
}

/// Resolver backed by the CDS Sesame name service (plain-text output)
#[derive(Debug, Clone)]
pub struct SesameResolver {
    client: reqwest::Client,
    endpoint: Url,
}

impl SesameResolver {
    /// Create a resolver from configuration
    ///
    /// # Errors
    /// Returns a configuration error if the endpoint is not a valid URL, or an
    /// error if the HTTP client cannot be created
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.sesame_url).map_err(|e| Error::Config {
            message: format!("invalid Sesame URL '{}': {}", config.sesame_url, e),
            key: Some("resolver.sesame_url".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("astrocollector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl NameResolver for SesameResolver {
    async fn resolve(&self, name: &str) -> std::result::Result<SkyPosition, ProviderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProviderError::NameResolution {
                name: name.to_string(),
                reason: "empty name".to_string(),
            });
        }

        let mut url = self.endpoint.clone();
        url.set_query(Some(name));

        tracing::debug!(object = %name, url = %url, "resolving object name");

        let failed = |reason: String| ProviderError::NameResolution {
            name: name.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| failed(format!("failed to read response: {}", e)))?;

        parse_sesame_text(name, &body)
    }
}

/// Extract the J2000 position from a Sesame plain-text answer
///
/// The position line has the form `%J 083.63308 +22.01450 = 05:34:31.93 +22:00:52.2`;
/// only the first match is used.
pub fn parse_sesame_text(
    name: &str,
    body: &str,
) -> std::result::Result<SkyPosition, ProviderError> {
    let failed = |reason: &str| ProviderError::NameResolution {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let line = body
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with("%J "))
        .ok_or_else(|| failed("object not found"))?;

    let mut fields = line["%J ".len()..].split_whitespace();
    let ra_deg = fields
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| failed("malformed right ascension"))?;
    let dec_deg = fields
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| failed("malformed declination"))?;

    SkyPosition::new(ra_deg, dec_deg).map_err(|e| failed(&e.to_string()))
}

/// Resolver answering from a fixed table
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    positions: HashMap<String, SkyPosition>,
}

impl StaticResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a known name
    pub fn with(mut self, name: &str, position: SkyPosition) -> Self {
        self.positions.insert(name.to_lowercase(), position);
        self
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> std::result::Result<SkyPosition, ProviderError> {
        self.positions
            .get(&name.trim().to_lowercase())
            .copied()
            .ok_or_else(|| ProviderError::NameResolution {
                name: name.to_string(),
                reason: "object not found".to_string(),
            })
    }
}
