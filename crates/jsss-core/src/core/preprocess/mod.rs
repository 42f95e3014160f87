//! Per-item transform from a raw corpus recording to derived tensors.

pub mod audio;
pub mod spectrogram;
pub mod tensor;

use std::path::Path;

use anyhow::Result;
use jsss_domain::{
    item_spectrogram_path, item_waveform_path, GenerationParams, ItemIdentity, SubtypeTable,
};
use tracing::trace;

use audio::{load_first_channel, resample};
use spectrogram::power_spectrogram;
use tensor::Tensor;

/// Writes every artifact `params` asks for for one item under
/// `contents_root`. Missing or malformed raw audio is
/// [`crate::AcquireError::SourceUnreadable`].
pub fn materialize(
    raw_path: &Path,
    id: ItemIdentity,
    contents_root: &Path,
    table: &SubtypeTable,
    params: &GenerationParams,
) -> Result<()> {
    let mut waveform = load_first_channel(raw_path)?;
    if let Some(rate) = params.resample_rate {
        waveform = resample(waveform, rate)?;
    }

    if let Some(spec_params) = params.spectrogram {
        let spec = power_spectrogram(&waveform.samples, spec_params);
        spec.write_npy(&item_spectrogram_path(contents_root, table, id))?;
    }
    let wave_path = item_waveform_path(contents_root, table, id);
    Tensor::vector(waveform.samples).write_npy(&wave_path)?;
    trace!(item = %id, path = %wave_path.display(), "materialized item");
    Ok(())
}
