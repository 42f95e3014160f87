use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::{write::FileOptions, CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::core::errors::AcquireError;
use crate::core::fs::{persist_named_tempfile, relative_files, StagingDir};

/// Packs a directory tree into one archive file and back.
pub trait Archiver: Send + Sync {
    /// Unpacks `archive` so that `dest` appears fully populated or not at all.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
    /// Packs every file under `source` into `archive`, replacing it.
    fn compress(&self, source: &Path, archive: &Path) -> Result<()>;
}

/// Deflate zip archives with sorted entries and a fixed timestamp.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file =
            File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
        let staging = StagingDir::for_destination(dest)?;
        let entries = unpack(file, staging.path()).map_err(|err| AcquireError::CorruptArchive {
            path: archive.to_path_buf(),
            reason: format!("{err:#}"),
        })?;
        staging.publish(dest)?;
        info!(
            archive = %archive.display(),
            dest = %dest.display(),
            entries,
            "extracted archive"
        );
        Ok(())
    }

    fn compress(&self, source: &Path, archive: &Path) -> Result<()> {
        let parent = archive.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let files = relative_files(source)?;
        let tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file under {}", parent.display()))?;
        let mut zip = ZipWriter::new(tmp);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        for rel in &files {
            let name = entry_name(rel);
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("failed to add {name} to {}", archive.display()))?;
            let mut src = File::open(source.join(rel))
                .with_context(|| format!("failed to open {}", source.join(rel).display()))?;
            io::copy(&mut src, &mut zip)?;
        }
        let tmp = zip
            .finish()
            .with_context(|| format!("failed to finish {}", archive.display()))?;
        persist_named_tempfile(tmp, archive)
            .with_context(|| format!("failed to persist {}", archive.display()))?;
        info!(
            source = %source.display(),
            archive = %archive.display(),
            entries = files.len(),
            "packed archive"
        );
        Ok(())
    }
}

fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn unpack(file: File, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(file)?;
    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name().map(|p| dest.join(p)) else {
            debug!(name = entry.name(), "skipping entry outside archive root");
            continue;
        };
        if entry.name().ends_with('/') || entry.is_dir() {
            fs::create_dir_all(&enclosed)?;
            continue;
        }
        if let Some(parent) = enclosed.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&enclosed)?;
        io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate(root: &Path) -> Result<()> {
        fs::create_dir_all(root.join("short-form/basic5000/waves"))?;
        fs::write(root.join("short-form/basic5000/waves/0001.wave.npy"), b"one")?;
        fs::write(root.join("short-form/basic5000/waves/0002.wave.npy"), b"two")?;
        fs::create_dir_all(root.join("summarization/waves"))?;
        fs::write(root.join("summarization/waves/001.wave.npy"), b"three")?;
        Ok(())
    }

    #[test]
    fn round_trip_reproduces_tree() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("source");
        populate(&source)?;
        let archive = temp.path().join("archive/key.zip");
        ZipArchiver.compress(&source, &archive)?;

        let dest = temp.path().join("restored");
        ZipArchiver.extract(&archive, &dest)?;
        assert_eq!(relative_files(&source)?, relative_files(&dest)?);
        for rel in relative_files(&source)? {
            assert_eq!(fs::read(source.join(&rel))?, fs::read(dest.join(&rel))?);
        }
        Ok(())
    }

    #[test]
    fn repacking_the_same_tree_is_byte_identical() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("source");
        populate(&source)?;
        let first = temp.path().join("a.zip");
        let second = temp.path().join("b.zip");
        ZipArchiver.compress(&source, &first)?;
        ZipArchiver.compress(&source, &second)?;
        assert_eq!(fs::read(first)?, fs::read(second)?);
        Ok(())
    }

    #[test]
    fn corrupt_archive_leaves_no_destination() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip file")?;
        let dest = temp.path().join("contents");
        let err = ZipArchiver.extract(&archive, &dest).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcquireError>(),
            Some(AcquireError::CorruptArchive { .. })
        ));
        assert!(!dest.exists());
        let leftovers: Vec<_> = fs::read_dir(temp.path())?.flatten().collect();
        assert_eq!(leftovers.len(), 1, "staging directory must be cleaned up");
        Ok(())
    }
}
