//! Request types and handlers behind the `jsss` command line.

mod corpus;
mod dataset;

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use jsss_domain::{DatasetKind, GenerationParams, SpectrogramParams, Subtype};

use crate::core::dataset::{SpecDatasetOptions, SpecMode, WaveDatasetOptions, DEFAULT_RESAMPLE_RATE};

pub use corpus::{corpus_fetch, corpus_identities, CorpusFetchRequest, IdentitiesRequest};
pub use dataset::{dataset_build, dataset_key, dataset_show, DatasetShowRequest};

/// Resampling choice as given on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resample {
    /// 16 kHz for waveforms, native rate for spectrograms.
    #[default]
    Default,
    Off,
    Rate(u32),
}

impl Resample {
    #[must_use]
    pub fn rate_for(self, kind: DatasetKind) -> Option<u32> {
        match (self, kind) {
            (Resample::Default, DatasetKind::Waveform) => Some(DEFAULT_RESAMPLE_RATE),
            (Resample::Default, DatasetKind::Spectrogram) | (Resample::Off, _) => None,
            (Resample::Rate(rate), _) => Some(rate),
        }
    }
}

impl FromStr for Resample {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Resample::Default),
            "none" | "off" => Ok(Resample::Off),
            other => {
                let rate: u32 = other
                    .parse()
                    .with_context(|| format!("invalid resample rate '{raw}'"))?;
                if rate == 0 {
                    bail!("resample rate must be positive");
                }
                Ok(Resample::Rate(rate))
            }
        }
    }
}

/// Dataset selection shared by `dataset key`, `build` and `show`.
#[derive(Clone, Debug)]
pub struct DatasetRequest {
    pub kind: DatasetKind,
    /// Empty selects `short-form/basic5000`.
    pub subtypes: Vec<Subtype>,
    pub resample: Resample,
    pub n_fft: Option<usize>,
}

impl DatasetRequest {
    #[must_use]
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            kind,
            subtypes: Vec::new(),
            resample: Resample::Default,
            n_fft: None,
        }
    }

    fn subtype_set(&self) -> BTreeSet<Subtype> {
        if self.subtypes.is_empty() {
            BTreeSet::from([Subtype::Basic5000])
        } else {
            self.subtypes.iter().copied().collect()
        }
    }

    fn spectrogram_params(&self) -> Result<SpectrogramParams> {
        match self.n_fft {
            None => Ok(SpectrogramParams::default()),
            Some(n_fft) if n_fft >= 2 => Ok(SpectrogramParams { n_fft }),
            Some(n_fft) => bail!("n_fft must be at least 2 (got {n_fft})"),
        }
    }

    pub fn params(&self) -> Result<GenerationParams> {
        Ok(match self.kind {
            DatasetKind::Waveform => self.wave_options().params(),
            DatasetKind::Spectrogram => self.spec_options(SpecMode::Train)?.params(),
        })
    }

    pub(crate) fn wave_options(&self) -> WaveDatasetOptions {
        WaveDatasetOptions {
            subtypes: self.subtype_set(),
            resample_rate: self.resample.rate_for(DatasetKind::Waveform),
            transform: None,
        }
    }

    pub(crate) fn spec_options(&self, mode: SpecMode) -> Result<SpecDatasetOptions> {
        Ok(SpecDatasetOptions {
            mode,
            subtypes: self.subtype_set(),
            resample_rate: self.resample.rate_for(DatasetKind::Spectrogram),
            spectrogram: self.spectrogram_params()?,
            transform: None,
        })
    }
}
