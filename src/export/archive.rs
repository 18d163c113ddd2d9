//! Zip packaging of a finished scratch directory.

use crate::error::{Error, ExportError, Result};
use std::path::{Path, PathBuf};

/// Zip every file in `scratch_dir` into `archive_path`
///
/// Entries are stored as `{scratch dir name}/{file name}` with deflate
/// compression. Runs on the blocking pool.
pub(crate) async fn zip_directory(scratch_dir: PathBuf, archive_path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || write_archive(&scratch_dir, &archive_path))
        .await
        .map_err(|e| Error::Other(format!("archive task failed: {}", e)))?
}

fn write_archive(scratch_dir: &Path, archive_path: &Path) -> Result<()> {
    let archive_err = |reason: String| {
        Error::Export(ExportError::Archive {
            path: archive_path.to_path_buf(),
            reason,
        })
    };

    let dir_name = scratch_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| archive_err("scratch directory has no usable name".to_string()))?;

    let mut files = Vec::new();
    for entry in std::fs::read_dir(scratch_dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let file = std::fs::File::create(archive_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };

        zip.start_file(format!("{}/{}", dir_name, name), options)
            .map_err(|e| archive_err(format!("failed to add {}: {}", name, e)))?;
        let mut source = std::fs::File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    zip.finish()
        .map_err(|e| archive_err(format!("failed to finish archive: {}", e)))?;

    tracing::debug!(archive = %archive_path.display(), entries = files.len(), "archive written");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[tokio::test]
    async fn entries_live_under_the_scratch_dir_name() {
        let temp = TempDir::new().unwrap();
        let scratch = temp.path().join("abc123");
        std::fs::create_dir(&scratch).unwrap();
        std::fs::write(scratch.join("export.csv"), "JulianDate\n1.0\n").unwrap();
        std::fs::write(scratch.join("other.csv"), "x").unwrap();

        let archive = temp.path().join("abc123.zip");
        zip_directory(scratch.clone(), archive.clone()).await.unwrap();

        let mut zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["abc123/export.csv", "abc123/other.csv"]);

        let mut content = String::new();
        zip.by_name("abc123/export.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "JulianDate\n1.0\n");
    }

    #[tokio::test]
    async fn empty_directory_makes_an_empty_archive() {
        let temp = TempDir::new().unwrap();
        let scratch = temp.path().join("empty");
        std::fs::create_dir(&scratch).unwrap();

        let archive = temp.path().join("empty.zip");
        zip_directory(scratch, archive.clone()).await.unwrap();

        let zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
