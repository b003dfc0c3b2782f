//! Mel-scale utilities, analysis windows, and filterbank generation.

use std::f64::consts::PI;

/// Generates a Hamming window of the given length.
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Povey window (hamming^0.85), the Kaldi default for speaker models.
pub fn povey_window(n: usize) -> Vec<f64> {
    hamming_window(n).into_iter().map(|w| w.powf(0.85)).collect()
}

/// Converts frequency in Hz to mel scale.
pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Converts mel scale frequency back to Hz.
pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Creates the triangular mel filterbank matrix.
///
/// Filter edges sit on a uniform mel grid between `low_freq` and `high_freq`;
/// each FFT bin is weighted by its mel distance to the filter center, so
/// triangles stay continuous rather than snapping to bin boundaries.
///
/// Returns `[num_mels][half_fft]` where `half_fft = fft_size / 2 + 1`.
pub fn mel_filter_bank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: usize,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);
    let spacing = (high_mel - low_mel) / (num_mels + 1) as f64;
    let hz_per_bin = sample_rate as f64 / fft_size as f64;

    let bin_mels: Vec<f64> = (0..half_fft)
        .map(|k| hz_to_mel(k as f64 * hz_per_bin))
        .collect();

    let mut bank = Vec::with_capacity(num_mels);
    for m in 0..num_mels {
        let left = low_mel + m as f64 * spacing;
        let center = left + spacing;
        let right = center + spacing;

        let filter: Vec<f64> = bin_mels
            .iter()
            .map(|&mel| {
                if mel <= left || mel >= right {
                    0.0
                } else if mel <= center {
                    (mel - left) / spacing
                } else {
                    (right - mel) / spacing
                }
            })
            .collect();
        bank.push(filter);
    }
    bank
}
