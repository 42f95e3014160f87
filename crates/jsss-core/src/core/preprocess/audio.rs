use std::path::Path;

use anyhow::{anyhow, Result};
use hound::{SampleFormat, WavReader};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::core::errors::AcquireError;

/// Mono signal in `[-1, 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Decodes a WAV file and keeps only its first channel.
pub fn load_first_channel(path: &Path) -> Result<Waveform> {
    decode(path).map_err(|err| {
        AcquireError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        }
        .into()
    })
}

fn decode(path: &Path) -> Result<Waveform> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        frames = samples.len(),
        "decoded wav"
    );
    Ok(Waveform {
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Resamples a mono signal; identity when the rates already match.
pub fn resample(waveform: Waveform, target_rate: u32) -> Result<Waveform> {
    if waveform.sample_rate == target_rate || waveform.samples.is_empty() {
        return Ok(Waveform {
            sample_rate: target_rate,
            samples: waveform.samples,
        });
    }
    let frames = waveform.samples.len();
    let mut resampler = FastFixedIn::<f32>::new(
        f64::from(target_rate) / f64::from(waveform.sample_rate),
        1.0,
        PolynomialDegree::Septic,
        frames,
        1,
    )
    .map_err(|err| anyhow!("failed to create resampler: {err}"))?;
    let mut output = resampler
        .process(&[waveform.samples], None)
        .map_err(|err| anyhow!("resampling failed: {err}"))?;
    let samples = output.pop().unwrap_or_default();
    debug!(
        from = waveform.sample_rate,
        to = target_rate,
        input_frames = frames,
        output_frames = samples.len(),
        "resampled"
    );
    Ok(Waveform {
        sample_rate: target_rate,
        samples,
    })
}
