//! Read-only indexed views over materialized datasets.

pub mod generate;
mod spectrogram;
mod split;
mod waveform;

use anyhow::Result;

pub use generate::{resolve_or_generate, DatasetLocation, Materialized, Provenance};
pub use spectrogram::{SpecDataset, SpecDatasetOptions, SpecDatum, SpecMode};
pub use split::{random_split, SpecDataModule, Stage, Subset, DEFAULT_VAL_SIZE};
pub use waveform::{WaveDataset, WaveDatasetOptions, WaveDatum, DEFAULT_RESAMPLE_RATE};

use crate::core::errors::DatasetError;

/// Fixed-length, indexable collection. Building one resolves or generates
/// its contents; `get` only reads files.
pub trait DatasetView {
    type Item;

    fn len(&self) -> usize;

    /// Loads item `index`; out-of-range indices are [`DatasetError::IndexOutOfRange`].
    fn get(&self, index: usize) -> Result<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(DatasetError::IndexOutOfRange { index, len }.into());
    }
    Ok(())
}
