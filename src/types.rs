//! Core types for astrocollector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// Stored as the hyphenated TEXT form so rows stay readable from the sqlite shell
impl sqlx::Type<sqlx::Sqlite> for TaskId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode(self.0.to_string(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(Uuid::parse_str(&text)?))
    }
}

/// Identifier of a registered catalog provider
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Create a ProviderId from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task status
///
/// `InProgress` is the only initial status; `Completed` and `Failed` are
/// terminal and never left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted and executing (or waiting for a worker slot)
    InProgress,
    /// The provider stream was exhausted and every batch was persisted
    Completed,
    /// Provisioning, provider or storage failure
    Failed,
}

impl TaskStatus {
    /// Convert integer status code to TaskStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => TaskStatus::InProgress,
            1 => TaskStatus::Completed,
            2 => TaskStatus::Failed,
            _ => TaskStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert TaskStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            TaskStatus::InProgress => 0,
            TaskStatus::Completed => 1,
            TaskStatus::Failed => 2,
        }
    }

    /// Whether this status can never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle transition
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        *self == TaskStatus::InProgress && next.is_terminal()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a task retrieves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Cone search or find-by-name; produces identifier results
    ObjectSearch,
    /// Time-series retrieval; produces measurement results
    PhotometricData,
}

impl TaskKind {
    /// Convert integer kind code to TaskKind enum
    pub fn from_i32(kind: i32) -> Self {
        match kind {
            1 => TaskKind::PhotometricData,
            _ => TaskKind::ObjectSearch,
        }
    }

    /// Convert TaskKind enum to integer kind code
    pub fn to_i32(&self) -> i32 {
        match self {
            TaskKind::ObjectSearch => 0,
            TaskKind::PhotometricData => 1,
        }
    }
}

/// Equatorial position in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkyPosition {
    /// Right ascension in degrees
    pub ra_deg: f64,
    /// Declination in degrees
    pub dec_deg: f64,
}

impl SkyPosition {
    /// Create a position, rejecting values outside the celestial sphere
    pub fn new(ra_deg: f64, dec_deg: f64) -> crate::Result<Self> {
        if !ra_deg.is_finite() || !(0.0..360.0).contains(&ra_deg) {
            return Err(crate::Error::Validation(format!(
                "right ascension {ra_deg} must be within [0, 360) degrees"
            )));
        }
        if !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(crate::Error::Validation(format!(
                "declination {dec_deg} must be within [-90, 90] degrees"
            )));
        }
        Ok(Self { ra_deg, dec_deg })
    }
}

/// An object identified by a provider's search
///
/// The common fields are fixed; anything else a provider needs to later fetch
/// the object's time series travels in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ObjectIdentifier {
    /// Provider that produced this identifier
    pub provider_id: ProviderId,
    /// Right ascension in degrees
    pub ra_deg: f64,
    /// Declination in degrees
    pub dec_deg: f64,
    /// Catalogue designation, when the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Angular distance from the search centre
    #[serde(default)]
    pub dist_arcsec: f64,
    /// Provider-specific fields
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single photometric measurement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Measurement {
    /// Provider that produced this measurement
    pub provider_id: ProviderId,
    /// Barycentric Julian date (BJD_TDB)
    pub julian_date: f64,
    /// Magnitude
    pub magnitude: f64,
    /// Magnitude uncertainty
    pub magnitude_error: f64,
    /// Photometric filter label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_filter: Option<String>,
}

/// The query a task executes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskQuery {
    /// Search around a sky position
    ConeSearch {
        /// Search centre
        position: SkyPosition,
        /// Search radius in arcseconds
        radius_arcsec: f64,
    },
    /// Resolve a name to a position, then cone-search around it
    FindObject {
        /// Object name understood by the name resolver
        name: String,
    },
    /// Fetch the time series of a previously identified object
    PhotometricData {
        /// The object to fetch
        identifier: ObjectIdentifier,
    },
}

impl TaskQuery {
    /// The kind of task this query produces
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskQuery::ConeSearch { .. } | TaskQuery::FindObject { .. } => TaskKind::ObjectSearch,
            TaskQuery::PhotometricData { .. } => TaskKind::PhotometricData,
        }
    }
}

/// Stored task record
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,
    /// What the task retrieves
    pub kind: TaskKind,
    /// Current status
    pub status: TaskStatus,
    /// When the task was submitted
    pub created_at: DateTime<Utc>,
}

/// Export bundling mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Every measurement of every task in one `export.csv`
    SingleFile,
    /// One CSV per provider
    ByProvider,
    /// The raw provider artifacts, unchanged
    RawBundle,
}

impl ExportMode {
    /// Stable string form, used in the cache key and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::SingleFile => "single_file",
            ExportMode::ByProvider => "by_provider",
            ExportMode::RawBundle => "raw_bundle",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single_file" => Some(ExportMode::SingleFile),
            "by_provider" => Some(ExportMode::ByProvider),
            "raw_bundle" => Some(ExportMode::RawBundle),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a provider, shown in listings and export file names
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderDescriptor {
    /// Registry identifier
    pub id: ProviderId,
    /// Human-readable catalogue name
    pub name: String,
    /// Short description of the catalogue
    #[serde(default)]
    pub description: String,
    /// Catalogue homepage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether a cone search returns single objects directly
    #[serde(default)]
    pub directly_identifies_objects: bool,
}
