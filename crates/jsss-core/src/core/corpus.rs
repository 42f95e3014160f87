use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use jsss_domain::{item_raw_path, CorpusVersion, ItemIdentity, Subtype, SubtypeTable};
use tracing::info;

use crate::core::config::Config;
use crate::core::effects::SharedEffects;
use crate::core::errors::AcquireError;
use crate::core::origin::OriginReference;
use crate::core::resolve::{Acquisition, ArchiveResolver, ArchiveSite};

/// JSSS corpus archive/contents handler.
pub struct JsssCorpus {
    table: SubtypeTable,
    site: ArchiveSite,
    origin: OriginReference,
    download_origin: bool,
    effects: SharedEffects,
}

impl JsssCorpus {
    /// Contents at `<corpus_root>/contents`, archive at
    /// `<corpus_root>/archive/jsss_ver1.zip` unless an address is configured.
    pub fn new(config: &Config, effects: SharedEffects) -> Result<Self> {
        let table = config.subtype_table()?;
        let root = config.corpus_root();
        let site = ArchiveSite::local(
            root.join("contents"),
            root.join("archive")
                .join(format!("{}.zip", CorpusVersion::default().corpus_name())),
        )
        .with_remote(config.corpus_address().cloned());
        Ok(Self {
            table,
            site,
            origin: OriginReference::jsss_ver1(),
            download_origin: config.download(),
            effects,
        })
    }

    #[must_use]
    pub fn with_origin(mut self, origin: OriginReference) -> Self {
        self.origin = origin;
        self
    }

    /// Makes the raw corpus tree available, pulling the origin when allowed.
    pub fn get_contents(&self) -> Result<Acquisition> {
        let resolver = ArchiveResolver::new(self.effects.as_ref());
        let acquisition =
            resolver.acquire_with_origin(&self.site, &self.origin, self.download_origin)?;
        if !acquisition.is_acquired() {
            return Err(AcquireError::CorpusUnavailable {
                address: self.site.address().to_string(),
            }
            .into());
        }
        info!(
            contents = %self.site.contents.display(),
            via = acquisition.as_str(),
            "corpus contents ready"
        );
        Ok(acquisition)
    }

    #[must_use]
    pub fn identities(&self, subtypes: &BTreeSet<Subtype>) -> Vec<ItemIdentity> {
        self.table.list_identities(subtypes)
    }

    #[must_use]
    pub fn item_path(&self, id: ItemIdentity) -> PathBuf {
        item_raw_path(&self.site.contents, &self.table, id)
    }

    #[must_use]
    pub fn contents_dir(&self) -> &Path {
        &self.site.contents
    }

    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.site.archive
    }

    #[must_use]
    pub fn table(&self) -> &SubtypeTable {
        &self.table
    }
}
