//! Log mel filterbank front-end for speaker recognition.
//!
//! Converts 16-bit linear PCM into `[T, num_mels]` log mel energy matrices,
//! the standard input representation for speaker-discriminative embeddings.
//!
//! Default parameters follow the Kaldi convention for speaker models:
//! - SampleRate: 16000
//! - WindowSize: 400 (25ms)
//! - HopSize: 160 (10ms)
//! - FFTSize: 512
//! - NumMels: 80
//! - LowFreq: 20 Hz
//! - HighFreq: 7600 Hz
//! - PreEmphasis: 0.97
//! - Povey window (hamming^0.85)
//!
//! The [`stats_pool`] helper collapses a feature matrix into a fixed-length
//! mean+stddev vector for voiceprint construction.

mod fft;
mod mel;

/// Configuration for mel filterbank extraction.
#[derive(Debug, Clone)]
pub struct Config {
    pub sample_rate: usize,
    pub window_size: usize,
    pub hop_size: usize,
    pub fft_size: usize,
    pub num_mels: usize,
    pub low_freq: f64,
    pub high_freq: f64,
    pub pre_emphasis: f64,
    /// Floor applied to mel energies before the log (default: 1e-10).
    pub energy_floor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            window_size: 400,
            hop_size: 160,
            fft_size: 512,
            num_mels: 80,
            low_freq: 20.0,
            high_freq: 7600.0,
            pre_emphasis: 0.97,
            energy_floor: 1e-10,
        }
    }
}

/// Mel filterbank feature extractor.
///
/// The analysis window and mel bank are precomputed at construction; a single
/// extractor can be shared across threads (`&self` extraction, no interior
/// state).
pub struct Extractor {
    cfg: Config,
    window: Vec<f64>,
    mel_bank: Vec<Vec<f64>>,
}

impl Extractor {
    /// Creates a new extractor with the given config.
    ///
    /// Panics if the config is degenerate (zero sizes, window larger than the
    /// FFT, or a non-power-of-2 FFT size).
    pub fn new(cfg: Config) -> Self {
        assert!(cfg.window_size > 0, "fbank: window_size must be positive");
        assert!(cfg.hop_size > 0, "fbank: hop_size must be positive");
        assert!(cfg.num_mels > 0, "fbank: num_mels must be positive");
        assert!(
            cfg.fft_size.is_power_of_two() && cfg.fft_size >= cfg.window_size,
            "fbank: fft_size must be a power of 2 >= window_size"
        );

        let window = mel::povey_window(cfg.window_size);
        let mel_bank = mel::mel_filter_bank(
            cfg.num_mels,
            cfg.fft_size,
            cfg.sample_rate,
            cfg.low_freq,
            cfg.high_freq,
        );
        Self { cfg, window, mel_bank }
    }

    /// Returns the configuration this extractor was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Extracts log mel filterbank features from 16-bit PCM samples.
    ///
    /// Returns `[T][num_mels]` where `T = (len(pcm) - window_size) / hop_size + 1`,
    /// or an empty matrix if the audio is shorter than one window.
    pub fn extract(&self, pcm: &[i16]) -> Vec<Vec<f32>> {
        let cfg = &self.cfg;
        let n = pcm.len();
        if n < cfg.window_size {
            return Vec::new();
        }

        // Normalize PCM16 to [-1, 1].
        let samples: Vec<f64> = pcm.iter().map(|&s| s as f64 / 32768.0).collect();

        let num_frames = (n - cfg.window_size) / cfg.hop_size + 1;
        let nfft = cfg.fft_size;
        let half_fft = nfft / 2 + 1;

        let mut features = Vec::with_capacity(num_frames);
        let mut frame = vec![0.0f64; cfg.window_size];
        let mut real = vec![0.0f64; nfft];
        let mut imag = vec![0.0f64; nfft];

        for t in 0..num_frames {
            let start = t * cfg.hop_size;
            frame.copy_from_slice(&samples[start..start + cfg.window_size]);

            // Remove DC offset per frame.
            let mean: f64 = frame.iter().sum::<f64>() / cfg.window_size as f64;
            for v in frame.iter_mut() {
                *v -= mean;
            }

            // Pre-emphasis, applied within the frame (Kaldi style).
            if cfg.pre_emphasis > 0.0 {
                for i in (1..cfg.window_size).rev() {
                    frame[i] -= cfg.pre_emphasis * frame[i - 1];
                }
                frame[0] *= 1.0 - cfg.pre_emphasis;
            }

            // Window, then zero-pad into the FFT buffers.
            for i in 0..cfg.window_size {
                real[i] = frame[i] * self.window[i];
            }
            for v in real[cfg.window_size..].iter_mut() {
                *v = 0.0;
            }
            for v in imag.iter_mut() {
                *v = 0.0;
            }

            fft::fft(&mut real, &mut imag);

            // Power spectrum
            let mut power = vec![0.0f64; half_fft];
            for i in 0..half_fft {
                power[i] = real[i] * real[i] + imag[i] * imag[i];
            }

            // Mel filterbank + log
            let mut row = vec![0.0f32; cfg.num_mels];
            for m in 0..cfg.num_mels {
                let mut sum = 0.0f64;
                for (k, &w) in self.mel_bank[m].iter().enumerate() {
                    sum += w * power[k];
                }
                if sum < cfg.energy_floor {
                    sum = cfg.energy_floor;
                }
                row[m] = sum.ln() as f32;
            }
            features.push(row);
        }

        features
    }
}

/// Collapses a `[T][num_mels]` feature matrix into a fixed-length vector by
/// concatenating the per-bin temporal mean and standard deviation.
///
/// The output has length `2 * num_mels`. Returns an empty vector for an
/// empty matrix. Uses f64 accumulation for reproducibility.
pub fn stats_pool(features: &[Vec<f32>]) -> Vec<f32> {
    if features.is_empty() {
        return Vec::new();
    }
    let num_mels = features[0].len();
    let t = features.len() as f64;

    let mut out = vec![0.0f32; 2 * num_mels];
    for m in 0..num_mels {
        let mut sum: f64 = 0.0;
        for row in features {
            sum += row[m] as f64;
        }
        let mean = sum / t;

        let mut var_sum: f64 = 0.0;
        for row in features {
            let d = row[m] as f64 - mean;
            var_sum += d * d;
        }
        let std = (var_sum / t).sqrt();

        out[m] = mean as f32;
        out[num_mels + m] = std as f32;
    }
    out
}
