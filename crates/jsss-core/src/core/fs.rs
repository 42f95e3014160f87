use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

const STALE_STAGING_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Scratch directory created next to its final destination so the finished
/// tree can be moved into place with a single rename.
pub(crate) struct StagingDir {
    inner: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl StagingDir {
    pub(crate) fn for_destination(dest: &Path) -> Result<Self> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let name = dest
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("staging");
        Self::new_in(parent, &format!(".{name}.staging-"))
    }

    pub(crate) fn new_in(root: &Path, prefix: &str) -> Result<Self> {
        fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))?;
        prune_stale_staging(root, prefix, STALE_STAGING_AGE);
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(root)
            .with_context(|| format!("failed to create staging dir under {}", root.display()))?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            inner: Some(dir),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the staged tree onto `dest`, which must not exist yet.
    pub(crate) fn publish(mut self, dest: &Path) -> Result<()> {
        if dest.exists() {
            bail!("refusing to replace existing {}", dest.display());
        }
        fs::rename(&self.path, dest).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                self.path.display(),
                dest.display()
            )
        })?;
        if let Some(dir) = self.inner.take() {
            // Already renamed away; keep() stops TempDir from touching `dest`.
            let _ = dir.keep();
        }
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        let Some(dir) = self.inner.take() else {
            return;
        };
        let path = dir.keep();
        let _ = fs::remove_dir_all(path);
    }
}

fn prune_stale_staging(root: &Path, prefix: &str, max_age: Duration) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    let now = SystemTime::now();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let Some(modified) = entry.metadata().ok().and_then(|meta| meta.modified().ok()) else {
            continue;
        };
        if now.duration_since(modified).unwrap_or_default() < max_age {
            continue;
        }
        let _ = fs::remove_dir_all(entry.path());
    }
}

pub(crate) fn persist_named_tempfile(tmp: NamedTempFile, dest: &Path) -> io::Result<()> {
    match tmp.persist(dest) {
        Ok(_) => Ok(()),
        Err(err) => {
            let file = err.file;
            if is_cross_device(&err.error) {
                let mut reader = file.reopen()?;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut writer = File::create(dest)?;
                io::copy(&mut reader, &mut writer)?;
                file.close().ok();
                Ok(())
            } else {
                Err(err.error)
            }
        }
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(18))
}

/// Sorted list of regular files under `root`, relative to it.
pub(crate) fn relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} escaped {}", entry.path().display(), root.display()))?;
        files.push(rel.to_path_buf());
    }
    Ok(files)
}
