#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod core;

pub use jsss_domain::{
    item_raw_path, CacheKey, CorpusVersion, DatasetKind, GenerationParams, ItemIdentity,
    SpectrogramParams, Subtype, SubtypeTable,
};

pub use crate::core::archive::{Archiver, ZipArchiver};
pub use crate::core::commands::{
    corpus_fetch, corpus_identities, dataset_build, dataset_key, dataset_show,
    CorpusFetchRequest, DatasetRequest, DatasetShowRequest, IdentitiesRequest, Resample,
};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{Config, ConfigOverrides, GlobalOptions};
pub use crate::core::corpus::JsssCorpus;
pub use crate::core::dataset::{
    random_split, resolve_or_generate, DatasetLocation, DatasetView, Materialized, Provenance,
    SpecDataModule, SpecDataset, SpecDatasetOptions, SpecDatum, SpecMode, Stage, Subset,
    WaveDataset, WaveDatasetOptions, WaveDatum, DEFAULT_RESAMPLE_RATE, DEFAULT_VAL_SIZE,
};
pub use crate::core::effects::{Effects, SharedEffects, SystemEffects};
pub use crate::core::errors::{AcquireError, DatasetError};
pub use crate::core::origin::{GoogleDriveTransfer, OriginReference, OriginTransfer};
pub use crate::core::outcome::{
    format_status_message, to_json_response, CommandInfo, CommandStatus, ExecutionOutcome,
};
pub use crate::core::preprocess::materialize;
pub use crate::core::preprocess::tensor::{Tensor, TensorTransform};
pub use crate::core::resolve::{Acquisition, ArchiveResolver, ArchiveSite};
pub use crate::core::store::{HttpStore, ObjectStore, StorageAddress, SystemObjectStore};

pub const JSSS_VERSION: &str = env!("CARGO_PKG_VERSION");
