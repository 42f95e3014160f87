//! Archive/contents resolution.
//!
//! Given a contents directory, a local archive path and an optional archive
//! address, decide the cheapest way to end up with a contents tree:
//!
//! 1. the contents directory already exists;
//! 2. the local archive exists and is extracted;
//! 3. the archive address holds a file which is fetched and extracted;
//! 4. (corpus only) the origin is fetched to the archive address and 1-3 are
//!    retried once.
//!
//! Anything else is a [`Acquisition::Miss`] and the caller generates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::effects::Effects;
use crate::core::errors::AcquireError;
use crate::core::origin::OriginReference;
use crate::core::store::StorageAddress;

#[cfg(test)]
mod tests;

/// Where one contents tree and its archive live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveSite {
    pub contents: PathBuf,
    pub archive: PathBuf,
    /// Archive file address, when it differs from `archive`.
    pub remote: Option<StorageAddress>,
}

impl ArchiveSite {
    #[must_use]
    pub fn local(contents: PathBuf, archive: PathBuf) -> Self {
        Self {
            contents,
            archive,
            remote: None,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Option<StorageAddress>) -> Self {
        self.remote = remote;
        self
    }

    /// The configured archive address, falling back to the local archive.
    #[must_use]
    pub fn address(&self) -> StorageAddress {
        self.remote
            .clone()
            .unwrap_or_else(|| StorageAddress::Local(self.archive.clone()))
    }

    fn distinct_remote(&self) -> Option<&StorageAddress> {
        self.remote
            .as_ref()
            .filter(|remote| !remote.is_local_path(&self.archive))
    }
}

/// How a contents tree came to exist, or that it could not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    /// Contents directory was already in place.
    Present,
    /// Extracted from the local archive.
    Extracted,
    /// Fetched from the archive address, then extracted.
    Fetched,
    /// Fetched from the origin, then extracted.
    Origin,
    Miss,
}

impl Acquisition {
    #[must_use]
    pub fn is_acquired(self) -> bool {
        !matches!(self, Self::Miss)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Extracted => "extracted",
            Self::Fetched => "fetched",
            Self::Origin => "origin",
            Self::Miss => "miss",
        }
    }
}

pub struct ArchiveResolver<'a> {
    effects: &'a dyn Effects,
}

impl<'a> ArchiveResolver<'a> {
    #[must_use]
    pub fn new(effects: &'a dyn Effects) -> Self {
        Self { effects }
    }

    /// Steps 1-3. A miss is a value; only inconsistent state and I/O fail.
    pub fn try_acquire(&self, site: &ArchiveSite, download: bool) -> Result<Acquisition> {
        if site.contents.is_dir() {
            debug!(contents = %site.contents.display(), "contents present");
            return Ok(Acquisition::Present);
        }
        if site.contents.exists() {
            return Err(AcquireError::InvalidLocalState {
                path: site.contents.clone(),
                expected: "directory",
            }
            .into());
        }

        if site.archive.is_file() {
            info!(archive = %site.archive.display(), "extracting local archive");
            self.effects
                .archiver()
                .extract(&site.archive, &site.contents)?;
            return Ok(Acquisition::Extracted);
        }
        if site.archive.exists() {
            return Err(AcquireError::InvalidLocalState {
                path: site.archive.clone(),
                expected: "file",
            }
            .into());
        }

        let Some(remote) = site.distinct_remote() else {
            debug!(archive = %site.archive.display(), "no archive address configured");
            return Ok(Acquisition::Miss);
        };
        let store = self.effects.store();
        if !store.exists(remote)? {
            debug!(%remote, "archive address is empty");
            return Ok(Acquisition::Miss);
        }
        if !store.is_file(remote)? {
            return Err(AcquireError::InvalidRemoteState {
                address: remote.to_string(),
            }
            .into());
        }
        if !download {
            info!(%remote, "archive exists at address but download is disabled");
            return Ok(Acquisition::Miss);
        }
        info!(%remote, archive = %site.archive.display(), "fetching archive");
        store.get_file(remote, &site.archive)?;
        self.effects
            .archiver()
            .extract(&site.archive, &site.contents)?;
        Ok(Acquisition::Fetched)
    }

    /// Steps 1-4. The archive address is always fetched when it holds a
    /// file; `download_origin` only gates the origin fallback, which pulls
    /// the origin to the archive address and retries once.
    pub fn acquire_with_origin(
        &self,
        site: &ArchiveSite,
        origin: &OriginReference,
        download_origin: bool,
    ) -> Result<Acquisition> {
        let first = self.try_acquire(site, true)?;
        if first.is_acquired() || !download_origin {
            return Ok(first);
        }

        let address = site.address().to_string();
        info!(%address, id = %origin.id, "archive missing everywhere; falling back to origin");
        if let Err(err) = self.fetch_origin(site, origin) {
            return Err(AcquireError::OriginAcquisitionFailed {
                address,
                reason: format!("{err:#}"),
            }
            .into());
        }
        match self.try_acquire(site, true) {
            Ok(Acquisition::Miss) => Err(AcquireError::OriginAcquisitionFailed {
                address,
                reason: "archive still missing after the origin fetch".into(),
            }
            .into()),
            Ok(_) => Ok(Acquisition::Origin),
            Err(err) => Err(AcquireError::OriginAcquisitionFailed {
                address,
                reason: format!("{err:#}"),
            }
            .into()),
        }
    }

    /// Lands the origin at the local archive path and copies it to the
    /// archive address when that is elsewhere.
    fn fetch_origin(&self, site: &ArchiveSite, origin: &OriginReference) -> Result<()> {
        self.effects
            .origin()
            .fetch_large_file(origin, &site.archive)?;
        if let Some(remote) = site.distinct_remote() {
            info!(%remote, "publishing origin archive");
            self.effects.store().put_file(&site.archive, remote)?;
        }
        Ok(())
    }

    /// Packs the contents tree into the local archive, then publishes it to
    /// the archive address when one is configured.
    pub fn save(&self, site: &ArchiveSite) -> Result<()> {
        self.effects
            .archiver()
            .compress(&site.contents, &site.archive)
            .with_context(|| format!("failed to archive {}", site.contents.display()))?;
        if let Some(remote) = site.distinct_remote() {
            info!(%remote, archive = %site.archive.display(), "publishing archive");
            self.effects.store().put_file(&site.archive, remote)?;
        }
        Ok(())
    }
}
