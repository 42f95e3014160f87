use std::collections::{BTreeMap, HashMap};
use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use jsss_domain::{CorpusVersion, Subtype, SubtypeTable};
use serde::{Deserialize, Serialize};

use super::file::{default_config_path, FileSettings};
use crate::core::store::StorageAddress;

const DEFAULT_DATA_ROOT: &str = "./data";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub config: Option<String>,
}

/// Values from the command line; they win over env and file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_root: Option<PathBuf>,
    pub download: Option<bool>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub(crate) fn flag(&self, key: &str) -> Option<bool> {
        self.vars.get(key).map(|value| {
            let lowered = value.trim().to_ascii_lowercase();
            !matches!(lowered.as_str(), "0" | "false" | "no" | "off" | "")
        })
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    data_root: PathBuf,
    corpus_address: Option<StorageAddress>,
    dataset_address: Option<StorageAddress>,
    download: bool,
    workers: usize,
    http_timeout: Duration,
    pad: BTreeMap<Subtype, usize>,
    exclude: BTreeMap<Subtype, Vec<u32>>,
    config_file: Option<PathBuf>,
}

impl Config {
    /// Builds the effective configuration: defaults, then the config file,
    /// then `JSSS_*` variables, then `overrides`.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        Self::from_sources(&EnvSnapshot::capture(), overrides)
    }

    /// Defaults rooted at `data_root`, ignoring env and config files.
    #[must_use]
    pub fn for_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            corpus_address: None,
            dataset_address: None,
            download: false,
            workers: default_workers(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            pad: BTreeMap::new(),
            exclude: BTreeMap::new(),
            config_file: None,
        }
    }

    pub(crate) fn from_sources(snapshot: &EnvSnapshot, overrides: &ConfigOverrides) -> Result<Self> {
        let config_file = overrides
            .config_file
            .clone()
            .or_else(|| snapshot.var("JSSS_CONFIG").map(PathBuf::from))
            .or_else(|| default_config_path().filter(|path| path.is_file()));
        let file = match &config_file {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Self::assemble(snapshot, file, overrides, config_file)
    }

    pub(crate) fn assemble(
        snapshot: &EnvSnapshot,
        file: FileSettings,
        overrides: &ConfigOverrides,
        config_file: Option<PathBuf>,
    ) -> Result<Self> {
        let data_root = overrides
            .data_root
            .clone()
            .or_else(|| snapshot.var("JSSS_DATA_ROOT").map(PathBuf::from))
            .or(file.data_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));

        let corpus_address = snapshot
            .var("JSSS_CORPUS_ADDRESS")
            .map(ToOwned::to_owned)
            .or(file.corpus_address)
            .map(|raw| StorageAddress::parse(&raw))
            .transpose()
            .context("invalid corpus address")?;
        let dataset_address = snapshot
            .var("JSSS_DATASET_ADDRESS")
            .map(ToOwned::to_owned)
            .or(file.dataset_address)
            .map(|raw| StorageAddress::parse(&raw))
            .transpose()
            .context("invalid dataset address")?;

        let download = overrides
            .download
            .or_else(|| snapshot.flag("JSSS_DOWNLOAD"))
            .or(file.download)
            .unwrap_or(false);

        let workers = match overrides.workers {
            Some(workers) => Some(workers),
            None => snapshot
                .var("JSSS_WORKERS")
                .map(|raw| {
                    raw.trim()
                        .parse::<usize>()
                        .with_context(|| format!("JSSS_WORKERS must be a positive integer, got `{raw}`"))
                })
                .transpose()?,
        }
        .or(file.workers)
        .unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(anyhow!("worker count must be at least 1"));
        }

        let http_timeout = snapshot
            .var("JSSS_HTTP_TIMEOUT")
            .map(|raw| {
                raw.trim().parse::<u64>().with_context(|| {
                    format!("JSSS_HTTP_TIMEOUT must be a number of seconds, got `{raw}`")
                })
            })
            .transpose()?
            .or(file.http_timeout_secs)
            .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs);

        let config = Self {
            data_root,
            corpus_address,
            dataset_address,
            download,
            workers,
            http_timeout,
            pad: file.pad,
            exclude: file.exclude,
            config_file,
        };
        // Fail early on overrides the table rejects.
        config.subtype_table()?;
        Ok(config)
    }

    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// `<data>/corpuses/JSSS`
    #[must_use]
    pub fn corpus_root(&self) -> PathBuf {
        self.data_root.join("corpuses").join("JSSS")
    }

    /// `<data>/datasets`
    #[must_use]
    pub fn datasets_root(&self) -> PathBuf {
        self.data_root.join("datasets")
    }

    #[must_use]
    pub fn corpus_address(&self) -> Option<&StorageAddress> {
        self.corpus_address.as_ref()
    }

    #[must_use]
    pub fn dataset_address(&self) -> Option<&StorageAddress> {
        self.dataset_address.as_ref()
    }

    #[must_use]
    pub fn download(&self) -> bool {
        self.download
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// The ver1 table with any `[pad]` and `[exclude]` overrides applied.
    pub fn subtype_table(&self) -> Result<SubtypeTable> {
        let mut table = SubtypeTable::for_version(CorpusVersion::default());
        for (&subtype, &pad) in &self.pad {
            table = table
                .with_pad(subtype, pad)
                .map_err(|err| anyhow!("invalid pad override: {err}"))?;
        }
        for (&subtype, serials) in &self.exclude {
            table = table
                .with_exclusions(subtype, serials.clone())
                .map_err(|err| anyhow!("invalid exclusion override: {err}"))?;
        }
        Ok(table)
    }

    /// Replaces the `[pad]` overrides.
    #[must_use]
    pub fn with_pad(mut self, pad: BTreeMap<Subtype, usize>) -> Self {
        self.pad = pad;
        self
    }

    /// Replaces the `[exclude]` overrides.
    #[must_use]
    pub fn with_exclusions(mut self, exclude: BTreeMap<Subtype, Vec<u32>>) -> Self {
        self.exclude = exclude;
        self
    }

    #[must_use]
    pub fn with_corpus_address(mut self, address: Option<StorageAddress>) -> Self {
        self.corpus_address = address;
        self
    }

    #[must_use]
    pub fn with_dataset_address(mut self, address: Option<StorageAddress>) -> Self {
        self.dataset_address = address;
        self
    }

    #[must_use]
    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
