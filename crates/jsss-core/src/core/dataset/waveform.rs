use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use jsss_domain::{item_waveform_path, GenerationParams, ItemIdentity, Subtype};

use super::generate::{resolve_or_generate, Materialized};
use super::{check_index, DatasetView};
use crate::core::config::Config;
use crate::core::effects::SharedEffects;
use crate::core::preprocess::tensor::{Tensor, TensorTransform};

pub const DEFAULT_RESAMPLE_RATE: u32 = 16_000;

#[derive(Clone)]
pub struct WaveDatasetOptions {
    pub subtypes: BTreeSet<Subtype>,
    pub resample_rate: Option<u32>,
    pub transform: Option<TensorTransform>,
}

impl Default for WaveDatasetOptions {
    fn default() -> Self {
        Self {
            subtypes: BTreeSet::from([Subtype::Basic5000]),
            resample_rate: Some(DEFAULT_RESAMPLE_RATE),
            transform: None,
        }
    }
}

impl WaveDatasetOptions {
    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams::waveform(self.subtypes.clone(), self.resample_rate)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WaveDatum {
    pub waveform: Tensor,
    pub label: String,
}

/// `JSSS_wave`: one mono waveform per utterance.
pub struct WaveDataset {
    materialized: Materialized,
    transform: Option<TensorTransform>,
}

impl WaveDataset {
    pub fn new(config: &Config, effects: &SharedEffects, options: WaveDatasetOptions) -> Result<Self> {
        let materialized = resolve_or_generate(config, effects, &options.params())?;
        Ok(Self {
            materialized,
            transform: options.transform,
        })
    }

    #[must_use]
    pub fn materialized(&self) -> &Materialized {
        &self.materialized
    }

    #[must_use]
    pub fn contents_dir(&self) -> &Path {
        self.materialized.location.contents()
    }

    #[must_use]
    pub fn identities(&self) -> &[ItemIdentity] {
        &self.materialized.identities
    }
}

impl DatasetView for WaveDataset {
    type Item = WaveDatum;

    fn len(&self) -> usize {
        self.materialized.identities.len()
    }

    fn get(&self, index: usize) -> Result<WaveDatum> {
        check_index(index, self.len())?;
        let id = self.materialized.identities[index];
        let path = item_waveform_path(self.contents_dir(), &self.materialized.table, id);
        let waveform = Tensor::read_npy(&path)?;
        let waveform = match &self.transform {
            Some(transform) => transform(waveform),
            None => waveform,
        };
        Ok(WaveDatum {
            waveform,
            label: id.label(),
        })
    }
}
