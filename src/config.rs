//! Configuration types for astrocollector

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration
///
/// Loading from files or the environment is left to the embedding
/// application; every field has a default.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Database and working directories
    #[serde(default)]
    pub storage: StorageConfig,

    /// Task execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Retention sweep settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Object name resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Directory holding raw provider artifacts (`{task_id}.csv`)
    pub fn raw_dir(&self) -> PathBuf {
        self.storage.work_dir.join("raw")
    }

    /// Directory holding export archives and scratch directories
    pub fn export_dir(&self) -> PathBuf {
        self.storage.work_dir.join("exports")
    }

    /// Reject settings that cannot work at runtime
    pub fn validate(&self) -> crate::Result<()> {
        if self.execution.max_concurrent_tasks == 0 {
            return Err(crate::Error::Config {
                message: "max_concurrent_tasks must be at least 1".to_string(),
                key: Some("execution.max_concurrent_tasks".to_string()),
            });
        }
        if self.storage.max_connections == 0 {
            return Err(crate::Error::Config {
                message: "max_connections must be at least 1".to_string(),
                key: Some("storage.max_connections".to_string()),
            });
        }
        if self.export.page_size == 0 {
            return Err(crate::Error::Config {
                message: "page_size must be at least 1".to_string(),
                key: Some("export.page_size".to_string()),
            });
        }
        if self.retention.sweep_interval.is_zero() {
            return Err(crate::Error::Config {
                message: "sweep_interval must be non-zero".to_string(),
                key: Some("retention.sweep_interval".to_string()),
            });
        }
        if !(self.execution.default_search_radius_arcsec > 0.0) {
            return Err(crate::Error::Config {
                message: "default_search_radius_arcsec must be positive".to_string(),
                key: Some("execution.default_search_radius_arcsec".to_string()),
            });
        }
        Ok(())
    }
}

/// Database and working directory configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Database path (default: "./astrocollector.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Maximum pooled database connections (default: 5)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Root for raw artifacts, export scratch space and archives (default: "./data")
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            work_dir: default_work_dir(),
        }
    }
}

/// Task execution configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExecutionConfig {
    /// Maximum tasks executing at once (default: 4)
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Radius used when a search does not give one (default: 30 arcsec)
    #[serde(default = "default_search_radius_arcsec")]
    pub default_search_radius_arcsec: f64,

    /// How long shutdown waits for executing tasks (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            default_search_radius_arcsec: default_search_radius_arcsec(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Export configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportConfig {
    /// Rows read per page while writing CSV files (default: 10000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Delimiter used when the caller does not give one (default: ',')
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_delimiter: default_delimiter(),
        }
    }
}

/// Retention sweep configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Run the periodic sweep (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tasks and exports older than this are deleted (default: 24 hours)
    #[serde(default = "default_max_age", with = "duration_serde")]
    pub max_age: Duration,

    /// Time between sweeps (default: 1 hour)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age: default_max_age(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Object name resolution configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolverConfig {
    /// Sesame endpoint; the object name is appended as the query string
    #[serde(default = "default_sesame_url")]
    pub sesame_url: String,

    /// Request timeout (default: 30 seconds)
    #[serde(default = "default_resolver_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sesame_url: default_sesame_url(),
            timeout: default_resolver_timeout(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8420)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./astrocollector.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_search_radius_arcsec() -> f64 {
    30.0
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_size() -> u32 {
    10_000
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_age() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_sesame_url() -> String {
    "https://cds.unistra.fr/cgi-bin/nph-sesame/-oI/A".to_string()
}

fn default_resolver_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8420))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
