use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use jsss_domain::{CacheKey, GenerationParams, ItemIdentity, SubtypeTable};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::corpus::JsssCorpus;
use crate::core::effects::SharedEffects;
use crate::core::fs::StagingDir;
use crate::core::preprocess::materialize;
use crate::core::resolve::{Acquisition, ArchiveResolver, ArchiveSite};

/// Where the dataset for one set of generation parameters lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLocation {
    pub key: CacheKey,
    pub site: ArchiveSite,
}

impl DatasetLocation {
    /// `<datasets>/<D>/contents/<K>` and `<datasets>/<D>/archive/<K>.zip`;
    /// a configured dataset address is a directory holding `<K>.zip`.
    pub fn for_params(
        config: &Config,
        table: &SubtypeTable,
        params: &GenerationParams,
    ) -> Result<Self> {
        let key = params.cache_key(table);
        let root = config.datasets_root().join(params.dataset.dir_name());
        let remote = config
            .dataset_address()
            .map(|address| address.join(&key.archive_file_name()))
            .transpose()?;
        let site = ArchiveSite::local(
            root.join("contents").join(key.as_str()),
            root.join("archive").join(key.archive_file_name()),
        )
        .with_remote(remote);
        Ok(Self { key, site })
    }

    #[must_use]
    pub fn contents(&self) -> &Path {
        &self.site.contents
    }
}

/// How a dataset's contents tree came to be present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Reused { via: Acquisition },
    Generated { items: usize },
}

#[derive(Clone, Debug)]
pub struct Materialized {
    pub location: DatasetLocation,
    pub table: SubtypeTable,
    pub identities: Vec<ItemIdentity>,
    pub provenance: Provenance,
}

/// Reuses an existing contents tree or archive for `params`, or generates
/// the dataset from the corpus, archives it and publishes it.
pub fn resolve_or_generate(
    config: &Config,
    effects: &SharedEffects,
    params: &GenerationParams,
) -> Result<Materialized> {
    if params.subtypes.is_empty() {
        bail!("select at least one subtype");
    }
    let table = config.subtype_table()?;
    let identities = table.list_identities(&params.subtypes);
    let location = DatasetLocation::for_params(config, &table, params)?;
    let resolver = ArchiveResolver::new(effects.as_ref());

    let acquisition = resolver.try_acquire(&location.site, true)?;
    if acquisition.is_acquired() {
        info!(
            dataset = params.dataset.dir_name(),
            key = %location.key,
            via = acquisition.as_str(),
            "dataset contents ready"
        );
        return Ok(Materialized {
            location,
            table,
            identities,
            provenance: Provenance::Reused { via: acquisition },
        });
    }

    info!(
        dataset = params.dataset.dir_name(),
        key = %location.key,
        items = identities.len(),
        "dataset archive not found; generating"
    );
    let corpus = JsssCorpus::new(config, effects.clone())?;
    corpus.get_contents()?;
    generate_contents(
        &corpus,
        &identities,
        &location.site.contents,
        params,
        config.workers(),
    )?;
    resolver.save(&location.site)?;
    info!(key = %location.key, "dataset generated and archived");

    let items = identities.len();
    Ok(Materialized {
        location,
        table,
        identities,
        provenance: Provenance::Generated { items },
    })
}

/// Runs the preprocessing pipeline for every identity into a staging tree
/// and moves it onto `contents` only when all items succeeded.
fn generate_contents(
    corpus: &JsssCorpus,
    identities: &[ItemIdentity],
    contents: &Path,
    params: &GenerationParams,
    workers: usize,
) -> Result<()> {
    let staging = StagingDir::for_destination(contents)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|idx| format!("jsss-preprocess-{idx}"))
        .build()
        .context("failed to start preprocessing workers")?;
    let done = AtomicUsize::new(0);
    let table = corpus.table();

    pool.install(|| {
        identities.par_iter().try_for_each(|&id| {
            materialize(&corpus.item_path(id), id, staging.path(), table, params)?;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % 100 == 0 {
                debug!("preprocessed {}/{}", finished, identities.len());
            }
            Ok::<(), anyhow::Error>(())
        })
    })?;
    staging.publish(contents)?;
    info!(
        contents = %contents.display(),
        items = identities.len(),
        workers,
        "preprocessing finished"
    );
    Ok(())
}
