//! Content-addressed export cache
//!
//! An export bundles the results of a set of finished tasks into a zip
//! archive. Archives are cached by a hash of the task-id set and the mode, so
//! asking twice for the same set (in any order) returns the same file.
//!
//! Three bundling modes exist (see [`ExportMode`]):
//! - `single_file`: every measurement in one `export.csv`
//! - `by_provider`: one CSV per provider, tasks grouped by the provider of
//!   their first measurement row
//! - `raw_bundle`: the raw provider artifacts, copied unchanged
//!
//! Concurrent requests for the same key share one build.

mod archive;
pub mod csv;


use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, ExportError, Result};
use crate::provider::ProviderRegistry;
use crate::types::{ExportMode, ProviderId, TaskId};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use self::csv::CsvSink;

/// File name used by `single_file` exports
pub const SINGLE_FILE_NAME: &str = "export.csv";

/// Cache key for a task set and mode
///
/// SHA-256 over the canonical JSON `{"export_option": mode, "task_ids": [...]}`
/// with the ids sorted and deduplicated, as 64 lowercase hex characters.
pub fn cache_key(task_ids: &[TaskId], mode: ExportMode) -> String {
    let ids: BTreeSet<String> = task_ids.iter().map(ToString::to_string).collect();
    let canonical = serde_json::json!({
        "export_option": mode.as_str(),
        "task_ids": ids,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Make a provider display name safe to use as a file name
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "provider".to_string()
    } else {
        cleaned
    }
}

/// Builds and caches export archives
#[derive(Clone)]
pub struct ExportEngine {
    db: Arc<Database>,
    providers: Arc<ProviderRegistry>,
    export_dir: PathBuf,
    raw_dir: PathBuf,
    page_size: u32,
    default_delimiter: String,
    /// One lock per cache key currently being looked up or built
    in_flight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ExportEngine {
    /// Create an engine writing archives under the configured export directory
    pub fn new(db: Arc<Database>, providers: Arc<ProviderRegistry>, config: &Config) -> Self {
        Self {
            db,
            providers,
            export_dir: config.export_dir(),
            raw_dir: config.raw_dir(),
            page_size: config.export.page_size,
            default_delimiter: config.export.default_delimiter.clone(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Path of a cached archive by file name
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.export_dir.join(file_name)
    }

    /// Produce (or reuse) the archive for `task_ids` in `mode`
    ///
    /// Returns the path of the zip file. `delimiter` falls back to the
    /// configured default; it only affects freshly built archives, so a cache
    /// hit returns whatever delimiter the first build used.
    ///
    /// # Errors
    /// - [`ExportError::EmptyTaskSet`] when `task_ids` is empty
    /// - [`Error::Validation`] when a task does not exist or is still running
    /// - [`ExportError::CacheLookup`] when the cache index cannot be read
    /// - [`ExportError::Archive`] when writing the archive fails
    pub async fn export(
        &self,
        task_ids: &[TaskId],
        mode: ExportMode,
        delimiter: Option<&str>,
    ) -> Result<PathBuf> {
        if task_ids.is_empty() {
            return Err(Error::Export(ExportError::EmptyTaskSet));
        }

        let delimiter = delimiter.unwrap_or(&self.default_delimiter);
        if delimiter.is_empty() || delimiter.contains(['\n', '\r', '"']) {
            return Err(Error::Validation(format!(
                "invalid delimiter {:?}",
                delimiter
            )));
        }

        self.ensure_finished(task_ids).await?;

        let key = cache_key(task_ids, mode);

        let key_lock = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(key.clone()).or_default())
        };

        let result = {
            let _guard = key_lock.lock().await;
            self.lookup_or_build(&key, task_ids, mode, delimiter).await
        };

        // Drop the key's lock entry once nobody else holds it
        {
            let mut in_flight = self.in_flight.lock().await;
            if Arc::strong_count(&key_lock) <= 2 {
                in_flight.remove(&key);
            }
        }

        result
    }

    /// Every task must exist and be in a terminal status; the cache key
    /// does not change when a running task gains rows.
    async fn ensure_finished(&self, task_ids: &[TaskId]) -> Result<()> {
        let ids: BTreeSet<TaskId> = task_ids.iter().copied().collect();
        for id in ids {
            match self.db.get_task_status(id).await? {
                None => {
                    return Err(Error::Validation(format!("task {} does not exist", id)));
                }
                Some(status) if !status.is_terminal() => {
                    return Err(Error::Validation(format!(
                        "task {} is still {}",
                        id, status
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn lookup_or_build(
        &self,
        key: &str,
        task_ids: &[TaskId],
        mode: ExportMode,
        delimiter: &str,
    ) -> Result<PathBuf> {
        let cached = self.db.find_export_by_hash(key).await.map_err(|e| {
            Error::Export(ExportError::CacheLookup(e.to_string()))
        })?;

        if let Some(record) = cached {
            let path = self.archive_path(&record.file_name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!(key = %key, archive = %path.display(), "export cache hit");
                return Ok(path);
            }

            tracing::warn!(key = %key, archive = %path.display(), "cached archive missing, rebuilding");
            self.db.delete_export(record.id).await?;
        }

        let path = self.build(task_ids, mode, delimiter).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Other("archive path has no file name".to_string()))?;

        self.db.insert_export(key, &file_name, mode).await?;
        tracing::info!(key = %key, mode = %mode, tasks = task_ids.len(), archive = %path.display(), "export built");
        Ok(path)
    }

    async fn build(&self, task_ids: &[TaskId], mode: ExportMode, delimiter: &str) -> Result<PathBuf> {
        let name = uuid::Uuid::new_v4().to_string();
        let scratch_dir = self.export_dir.join(&name);
        let archive_path = self.export_dir.join(format!("{}.zip", name));

        tokio::fs::create_dir_all(&scratch_dir).await?;

        let ids: Vec<TaskId> = task_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let filled = match mode {
            ExportMode::SingleFile => self.write_single_file(&scratch_dir, &ids, delimiter).await,
            ExportMode::ByProvider => self.write_by_provider(&scratch_dir, &ids, delimiter).await,
            ExportMode::RawBundle => self.copy_raw_artifacts(&scratch_dir, &ids).await,
        };

        let result = match filled {
            Ok(()) => archive::zip_directory(scratch_dir.clone(), archive_path.clone()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&scratch_dir).await {
            tracing::warn!(path = %scratch_dir.display(), error = %e, "failed to remove export scratch directory");
        }

        if let Err(e) = result {
            match tokio::fs::remove_file(&archive_path).await {
                Ok(()) => {}
                Err(io) if io.kind() == std::io::ErrorKind::NotFound => {}
                Err(io) => {
                    tracing::warn!(path = %archive_path.display(), error = %io, "failed to remove partial export archive");
                }
            }
            return Err(e);
        }

        Ok(archive_path)
    }

    async fn write_single_file(&self, dir: &Path, ids: &[TaskId], delimiter: &str) -> Result<()> {
        let mut sink = CsvSink::create(&dir.join(SINGLE_FILE_NAME), delimiter, &self.providers).await?;
        for id in ids {
            sink.append_task(&self.db, *id, self.page_size).await?;
        }
        let rows = sink.finish().await?;
        tracing::debug!(rows, tasks = ids.len(), "single-file export written");
        Ok(())
    }

    async fn write_by_provider(&self, dir: &Path, ids: &[TaskId], delimiter: &str) -> Result<()> {
        let groups = self.group_by_first_provider(ids).await?;
        let mut used_names = HashSet::new();

        for (provider_id, task_ids) in &groups {
            let file_name = provider_file_name(
                &self.providers.display_name(provider_id),
                provider_id,
                &mut used_names,
            );
            let mut sink = CsvSink::create(&dir.join(&file_name), delimiter, &self.providers).await?;
            for id in task_ids {
                sink.append_task(&self.db, *id, self.page_size).await?;
            }
            let rows = sink.finish().await?;
            tracing::debug!(provider_id = %provider_id, file = %file_name, rows, "provider export written");
        }
        Ok(())
    }

    async fn copy_raw_artifacts(&self, dir: &Path, ids: &[TaskId]) -> Result<()> {
        let groups = self.group_by_first_provider(ids).await?;

        for (provider_id, task_ids) in &groups {
            let prefix = sanitize_file_name(&self.providers.display_name(provider_id));
            for id in task_ids {
                let source = self.raw_dir.join(format!("{}.csv", id));
                let target = dir.join(format!("{}_{}.csv", prefix, id));
                match tokio::fs::copy(&source, &target).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        tracing::debug!(task_id = %id, "no raw artifact for task, skipping");
                    }
                    Err(e) => return Err(Error::Io(e)),
                }
            }
        }
        Ok(())
    }

    /// Tasks keyed by the provider of their first measurement row
    ///
    /// Tasks without measurement rows are left out.
    async fn group_by_first_provider(
        &self,
        ids: &[TaskId],
    ) -> Result<BTreeMap<ProviderId, Vec<TaskId>>> {
        let mut groups: BTreeMap<ProviderId, Vec<TaskId>> = BTreeMap::new();
        for id in ids {
            match self.db.first_measurement_provider(*id).await? {
                Some(provider_id) => groups.entry(provider_id).or_default().push(*id),
                None => tracing::debug!(task_id = %id, "task has no measurements, skipping"),
            }
        }
        Ok(groups)
    }
}

/// CSV file name for one provider, unique (case-insensitively) within `used`
///
/// A clash falls back to `{name}_{provider_id}`, then a numeric suffix.
fn provider_file_name(
    display_name: &str,
    provider_id: &ProviderId,
    used: &mut HashSet<String>,
) -> String {
    let base = sanitize_file_name(display_name);
    let mut candidate = base.clone();
    if used.contains(&candidate.to_lowercase()) {
        candidate = sanitize_file_name(&format!("{}_{}", base, provider_id));
    }
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        candidate = sanitize_file_name(&format!("{}_{}_{}", base, provider_id, n));
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    format!("{}.csv", candidate)
}
