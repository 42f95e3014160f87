#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod identity;
pub mod key;
pub mod paths;

pub use identity::{
    CorpusVersion, ItemIdentity, Subtype, SubtypeSpec, SubtypeTable, TableError, SUBTYPE_COUNT,
};
pub use key::{CacheKey, DatasetKind, GenerationParams, SpectrogramParams};
pub use paths::{
    item_path, item_raw_path, item_spectrogram_path, item_waveform_path, ArtifactKind,
    RAW_AUDIO_DIR, SPECS_DIR, TENSOR_EXTENSION, WAVES_DIR,
};
