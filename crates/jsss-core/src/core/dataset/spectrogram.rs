use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use jsss_domain::{
    item_spectrogram_path, item_waveform_path, GenerationParams, ItemIdentity, SpectrogramParams,
    Subtype,
};

use super::generate::{resolve_or_generate, Materialized};
use super::{check_index, DatasetView};
use crate::core::config::Config;
use crate::core::effects::SharedEffects;
use crate::core::preprocess::tensor::{Tensor, TensorTransform};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpecMode {
    #[default]
    Train,
    Eval,
}

#[derive(Clone)]
pub struct SpecDatasetOptions {
    pub mode: SpecMode,
    pub subtypes: BTreeSet<Subtype>,
    pub resample_rate: Option<u32>,
    pub spectrogram: SpectrogramParams,
    pub transform: Option<TensorTransform>,
}

impl Default for SpecDatasetOptions {
    fn default() -> Self {
        Self {
            mode: SpecMode::Train,
            subtypes: BTreeSet::from([Subtype::Basic5000]),
            resample_rate: None,
            spectrogram: SpectrogramParams::default(),
            transform: None,
        }
    }
}

impl SpecDatasetOptions {
    /// Mode and transform only affect loading, not the generated bytes.
    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams::spectrogram(self.subtypes.clone(), self.resample_rate, self.spectrogram)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpecDatum {
    Train {
        spectrogram: Tensor,
        label: String,
    },
    Eval {
        waveform: Tensor,
        spectrogram: Tensor,
        label: String,
    },
}

impl SpecDatum {
    #[must_use]
    pub fn spectrogram(&self) -> &Tensor {
        match self {
            Self::Train { spectrogram, .. } | Self::Eval { spectrogram, .. } => spectrogram,
        }
    }

    #[must_use]
    pub fn waveform(&self) -> Option<&Tensor> {
        match self {
            Self::Train { .. } => None,
            Self::Eval { waveform, .. } => Some(waveform),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Train { label, .. } | Self::Eval { label, .. } => label,
        }
    }
}

/// `JSSS_spec`: power spectrograms, plus the waveform in eval mode.
pub struct SpecDataset {
    materialized: Materialized,
    mode: SpecMode,
    transform: Option<TensorTransform>,
}

impl SpecDataset {
    pub fn new(config: &Config, effects: &SharedEffects, options: SpecDatasetOptions) -> Result<Self> {
        let materialized = resolve_or_generate(config, effects, &options.params())?;
        Ok(Self {
            materialized,
            mode: options.mode,
            transform: options.transform,
        })
    }

    #[must_use]
    pub fn mode(&self) -> SpecMode {
        self.mode
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

impl DatasetView for SpecDataset {
    type Item = SpecDatum;

    fn len(&self) -> usize {
        self.materialized.identities.len()
    }

    fn get(&self, index: usize) -> Result<SpecDatum> {
        check_index(index, self.len())?;
        let id = self.materialized.identities[index];
        let table = &self.materialized.table;
        let spectrogram = Tensor::read_npy(&item_spectrogram_path(self.contents_dir(), table, id))?;
        let spectrogram = match &self.transform {
            Some(transform) => transform(spectrogram),
            None => spectrogram,
        };
        let label = id.label();
        Ok(match self.mode {
            SpecMode::Train => SpecDatum::Train { spectrogram, label },
            SpecMode::Eval => SpecDatum::Eval {
                waveform: Tensor::read_npy(&item_waveform_path(self.contents_dir(), table, id))?,
                spectrogram,
                label,
            },
        })
    }
}
