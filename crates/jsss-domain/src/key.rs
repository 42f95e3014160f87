use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::{CorpusVersion, Subtype, SubtypeTable};

const KEY_SCHEMA: &str = "jsss-cache-key/v2";
const KEY_BYTES: usize = 16;

/// Derived datasets that can be generated from the corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Waveform,
    Spectrogram,
}

impl DatasetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Waveform => "wave",
            DatasetKind::Spectrogram => "spec",
        }
    }

    /// Directory under the datasets root holding `contents/` and `archive/`.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            DatasetKind::Waveform => "JSSS_wave",
            DatasetKind::Spectrogram => "JSSS_spec",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wave" | "waveform" => Ok(DatasetKind::Waveform),
            "spec" | "spectrogram" => Ok(DatasetKind::Spectrogram),
            other => bail!("unknown dataset kind '{other}' (expected 'wave' or 'spec')"),
        }
    }
}

/// Short-time Fourier transform settings for spectrogram generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpectrogramParams {
    pub n_fft: usize,
}

impl SpectrogramParams {
    #[must_use]
    pub fn hop_length(&self) -> usize {
        self.n_fft / 2
    }

    #[must_use]
    pub fn freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self { n_fft: 254 }
    }
}

/// Every parameter that changes the bytes of a generated dataset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationParams {
    pub dataset: DatasetKind,
    pub corpus_version: CorpusVersion,
    pub subtypes: BTreeSet<Subtype>,
    pub resample_rate: Option<u32>,
    pub spectrogram: Option<SpectrogramParams>,
}

impl GenerationParams {
    #[must_use]
    pub fn waveform(subtypes: BTreeSet<Subtype>, resample_rate: Option<u32>) -> Self {
        Self {
            dataset: DatasetKind::Waveform,
            corpus_version: CorpusVersion::default(),
            subtypes,
            resample_rate,
            spectrogram: None,
        }
    }

    #[must_use]
    pub fn spectrogram(
        subtypes: BTreeSet<Subtype>,
        resample_rate: Option<u32>,
        params: SpectrogramParams,
    ) -> Self {
        Self {
            dataset: DatasetKind::Spectrogram,
            corpus_version: CorpusVersion::default(),
            subtypes,
            resample_rate,
            spectrogram: Some(params),
        }
    }

    /// Content-addressed key namespacing the contents tree and archive.
    ///
    /// `table` supplies the file layout (pad width, range, exclusions) of
    /// every selected subtype, since it decides which files are read and
    /// how the generated ones are named.
    #[must_use]
    pub fn cache_key(&self, table: &SubtypeTable) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(KEY_SCHEMA.as_bytes());
        hasher.update(b"\n");
        hasher.update(b"dataset:");
        hasher.update(self.dataset.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(b"corpus:");
        hasher.update(self.corpus_version.tag().as_bytes());
        hasher.update(b"\n");
        // BTreeSet iterates in canonical subtype order.
        for subtype in &self.subtypes {
            hasher.update(b"subtype:");
            hasher.update(subtype.as_str().as_bytes());
            hasher.update(b"\n");
            hasher.update(b"layout:");
            hasher.update(table.spec(*subtype).layout().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(b"resample:");
        match self.resample_rate {
            Some(rate) => hasher.update(rate.to_string().as_bytes()),
            None => hasher.update(b"none"),
        }
        hasher.update(b"\n");
        hasher.update(b"spectrogram:");
        match self.spectrogram {
            Some(params) => hasher.update(params.n_fft.to_string().as_bytes()),
            None => hasher.update(b"none"),
        }
        hasher.update(b"\n");
        let digest = hasher.finalize();
        CacheKey(hex::encode(&digest[..KEY_BYTES]))
    }
}

/// Fixed-width hex digest of a [`GenerationParams`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SubtypeTable {
        SubtypeTable::default()
    }

    fn basic() -> BTreeSet<Subtype> {
        BTreeSet::from([Subtype::Basic5000])
    }

    #[test]
    fn key_is_fixed_width_hex() {
        let key = GenerationParams::waveform(basic(), Some(16_000)).cache_key(&table());
        assert_eq!(key.as_str().len(), KEY_BYTES * 2);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.archive_file_name(), format!("{key}.zip"));
    }

    #[test]
    fn equal_params_share_a_key() {
        let a = GenerationParams::waveform(
            BTreeSet::from([Subtype::Udon, Subtype::Basic5000]),
            Some(16_000),
        );
        let b = GenerationParams::waveform(
            [Subtype::Basic5000, Subtype::Udon, Subtype::Udon]
                .into_iter()
                .collect(),
            Some(16_000),
        );
        assert_eq!(a, b);
        assert_eq!(a.cache_key(&table()), b.cache_key(&table()));
    }

    #[test]
    fn any_output_affecting_field_changes_the_key() {
        let base = GenerationParams::spectrogram(basic(), None, SpectrogramParams::default());
        let variants = [
            GenerationParams {
                subtypes: BTreeSet::from([Subtype::Basic5000, Subtype::Udon]),
                ..base.clone()
            },
            GenerationParams {
                resample_rate: Some(16_000),
                ..base.clone()
            },
            GenerationParams {
                spectrogram: Some(SpectrogramParams { n_fft: 512 }),
                ..base.clone()
            },
            GenerationParams {
                dataset: DatasetKind::Waveform,
                spectrogram: None,
                ..base.clone()
            },
        ];
        let base_key = base.cache_key(&table());
        let mut seen = vec![base_key.clone()];
        for variant in variants {
            let key = variant.cache_key(&table());
            assert_ne!(key, base_key, "{variant:?}");
            assert!(!seen.contains(&key));
            seen.push(key);
        }
    }

    #[test]
    fn subtype_layout_changes_the_key() {
        let params = GenerationParams::waveform(
            BTreeSet::from([Subtype::WashingtonDc]),
            Some(16_000),
        );
        let base = params.cache_key(&table());
        let padded = table().with_pad(Subtype::WashingtonDc, 3).unwrap();
        assert_ne!(params.cache_key(&padded), base);
        let excluded = table()
            .with_exclusions(Subtype::WashingtonDc, vec![12])
            .unwrap();
        assert_ne!(params.cache_key(&excluded), base);

        // Layout of unselected subtypes is irrelevant.
        let other = table().with_pad(Subtype::Udon, 3).unwrap();
        assert_eq!(params.cache_key(&other), base);
    }

    #[test]
    fn resample_none_differs_from_every_rate() {
        let none = GenerationParams::waveform(basic(), None).cache_key(&table());
        for rate in [8_000, 16_000, 22_050, 24_000] {
            assert_ne!(
                none,
                GenerationParams::waveform(basic(), Some(rate)).cache_key(&table())
            );
        }
    }

    #[test]
    fn dataset_kind_parses_aliases() {
        assert_eq!("wave".parse::<DatasetKind>().unwrap(), DatasetKind::Waveform);
        assert_eq!(
            "Spectrogram".parse::<DatasetKind>().unwrap(),
            DatasetKind::Spectrogram
        );
        assert!("mel".parse::<DatasetKind>().is_err());
    }
}
