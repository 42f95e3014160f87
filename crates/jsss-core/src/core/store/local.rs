use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::fs::persist_named_tempfile;

pub(super) fn exists(path: &Path) -> bool {
    path.exists()
}

pub(super) fn is_file(path: &Path) -> bool {
    path.is_file()
}

/// Copies `src` to `dest` through a temp file in the destination directory so
/// `dest` never holds a half-written archive.
pub(super) fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if src == dest {
        return Ok(());
    }
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let mut reader =
        File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file under {}", parent.display()))?;
    let copied = io::copy(&mut reader, &mut tmp)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;
    persist_named_tempfile(tmp, dest)
        .with_context(|| format!("failed to persist {}", dest.display()))?;
    debug!(src = %src.display(), dest = %dest.display(), bytes = copied, "copied archive");
    Ok(())
}
