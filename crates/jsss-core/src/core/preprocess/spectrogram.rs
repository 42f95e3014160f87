use apodize::hanning_iter;
use jsss_domain::SpectrogramParams;
use rustfft::{num_complex::Complex, FftPlanner};

use super::tensor::Tensor;

/// Power spectrogram with a periodic Hann window and centered frames.
///
/// Output shape is `[n_fft / 2 + 1, frames]`.
#[must_use]
pub fn power_spectrogram(signal: &[f32], params: SpectrogramParams) -> Tensor {
    let n_fft = params.n_fft;
    let hop = params.hop_length().max(1);
    let bins = params.freq_bins();

    let padded = center_pad(signal, n_fft / 2);
    let frames = 1 + padded.len().saturating_sub(n_fft) / hop;

    // Periodic Hann is the first n points of an (n + 1)-point symmetric one.
    let window: Vec<f32> = hanning_iter(n_fft + 1)
        .take(n_fft)
        .map(|x| x as f32)
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
    let mut scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

    let mut data = vec![0.0_f32; bins * frames];
    for frame in 0..frames {
        let start = frame * hop;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (bin, value) in buffer.iter().take(bins).enumerate() {
            data[bin * frames + frame] = value.norm_sqr();
        }
    }
    Tensor::matrix(bins, frames, data)
}

/// Reflect-pads both ends by `pad`; falls back to zeros when the signal is
/// too short to reflect.
fn center_pad(signal: &[f32], pad: usize) -> Vec<f32> {
    let len = signal.len();
    let mut out = Vec::with_capacity(len + 2 * pad);
    if len > pad {
        out.extend((1..=pad).rev().map(|i| signal[i]));
        out.extend_from_slice(signal);
        out.extend((0..pad).map(|i| signal[len - 2 - i]));
    } else {
        out.extend(std::iter::repeat(0.0).take(pad));
        out.extend_from_slice(signal);
        out.extend(std::iter::repeat(0.0).take(pad));
    }
    out
}
