//! Pluggable speaker embedding backend.
//!
//! The engine scores speakers by cosine similarity between embedding vectors.
//! How those vectors are produced is behind the [`SpeakerModel`] trait: the
//! built-in [`FbankModel`] derives a deterministic voiceprint from log mel
//! filterbank statistics, and an inference-backed model (ONNX, ncnn, ...)
//! can be supplied instead without touching the enrollment or recognition
//! state machines.

use eagle_fbank::{stats_pool, Config as FbankConfig, Extractor};

use crate::error::EagleError;
use crate::params::ModelParams;

/// Extracts speaker-discriminative embedding vectors from raw audio.
///
/// The input is single-channel 16-bit PCM at the model sample rate. The
/// output is a dense f32 vector whose length is [`SpeakerModel::dimension`].
/// For a fixed input the output must be reproducible: recognition relies on
/// replay-after-reset producing identical scores.
///
/// Implementations must be safe for concurrent use.
pub trait SpeakerModel: Send + Sync {
    /// Computes a speaker embedding from PCM samples.
    fn embed(&self, pcm: &[i16]) -> Result<Vec<f32>, EagleError>;

    /// Returns the dimensionality of the embedding vectors.
    fn dimension(&self) -> usize;
}

/// Built-in embedding backend based on log mel filterbank statistics.
///
/// # Pipeline
///
/// 1. PCM16 -> log mel filterbank matrix (`eagle-fbank`)
/// 2. Temporal mean+stddev pooling per mel bin
/// 3. Per-block mean removal (mean half and stddev half centered separately,
///    so the spectral *shape* carries the signal rather than the shared
///    energy floor)
/// 4. L2 normalization
///
/// Silence pools to the zero vector, which scores 0 against every profile.
pub struct FbankModel {
    extractor: Extractor,
    num_mels: usize,
}

impl FbankModel {
    /// Creates the backend for the given model parameters.
    pub fn new(params: &ModelParams) -> Self {
        let cfg = FbankConfig {
            sample_rate: params.sample_rate as usize,
            num_mels: params.num_mels as usize,
            ..FbankConfig::default()
        };
        Self {
            extractor: Extractor::new(cfg),
            num_mels: params.num_mels as usize,
        }
    }
}

impl SpeakerModel for FbankModel {
    fn embed(&self, pcm: &[i16]) -> Result<Vec<f32>, EagleError> {
        let features = self.extractor.extract(pcm);
        if features.is_empty() {
            return Err(EagleError::InvalidArgument(format!(
                "audio too short for feature extraction: {} samples, need at least {}",
                pcm.len(),
                self.extractor.config().window_size
            )));
        }

        let mut v = stats_pool(&features);
        debug_assert_eq!(v.len(), 2 * self.num_mels);

        let (means, stds) = v.split_at_mut(self.num_mels);
        center(means);
        center(stds);
        l2_normalize(&mut v);
        Ok(v)
    }

    fn dimension(&self) -> usize {
        2 * self.num_mels
    }
}

/// Subtracts the arithmetic mean from every element.
fn center(v: &mut [f32]) {
    if v.is_empty() {
        return;
    }
    let mean = (v.iter().map(|&x| x as f64).sum::<f64>() / v.len() as f64) as f32;
    for x in v.iter_mut() {
        *x -= mean;
    }
}

/// Cosine similarity between two vectors.
/// Uses f64 intermediate precision for reproducibility.
pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let mut dot: f64 = 0.0;
    let mut na: f64 = 0.0;
    let mut nb: f64 = 0.0;
    for i in 0..a.len().min(b.len()) {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        dot += ai * bi;
        na += ai * ai;
        nb += bi * bi;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Normalizes a vector to unit length in-place.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let mut sum: f64 = 0.0;
    for &x in v.iter() {
        sum += (x as f64) * (x as f64);
    }
    let norm = sum.sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn harmonic_pcm(base_hz: f64, n_samples: usize) -> Vec<i16> {
        (0..n_samples)
            .map(|i| {
                let t = i as f64 / 16000.0;
                let s = (base_hz * 2.0 * PI * t).sin()
                    + 0.5 * (2.0 * base_hz * 2.0 * PI * t).sin()
                    + 0.25 * (3.0 * base_hz * 2.0 * PI * t).sin();
                (7000.0 * s) as i16
            })
            .collect()
    }

    #[test]
    fn embedding_dimension() {
        let model = FbankModel::new(&ModelParams::default());
        assert_eq!(model.dimension(), 160);
        let emb = model.embed(&harmonic_pcm(200.0, 16000)).unwrap();
        assert_eq!(emb.len(), 160);
    }

    #[test]
    fn embedding_unit_norm() {
        let model = FbankModel::new(&ModelParams::default());
        let emb = model.embed(&harmonic_pcm(200.0, 16000)).unwrap();
        let norm: f64 = emb.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit length, got {norm}");
    }

    #[test]
    fn embedding_deterministic() {
        let model = FbankModel::new(&ModelParams::default());
        let pcm = harmonic_pcm(200.0, 16000);
        assert_eq!(model.embed(&pcm).unwrap(), model.embed(&pcm).unwrap());
    }

    #[test]
    fn embedding_too_short() {
        let model = FbankModel::new(&ModelParams::default());
        assert!(matches!(
            model.embed(&[0i16; 100]),
            Err(EagleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn silence_embeds_to_zero() {
        let model = FbankModel::new(&ModelParams::default());
        let emb = model.embed(&vec![0i16; 16000]).unwrap();
        for &x in &emb {
            assert!(x.abs() < 1e-5);
        }
    }

    #[test]
    fn same_source_high_similarity() {
        let model = FbankModel::new(&ModelParams::default());
        let a1 = model.embed(&harmonic_pcm(200.0, 32000)).unwrap();
        let a2 = model.embed(&harmonic_pcm(200.0, 24000)).unwrap();
        let sim = cosine_sim(&a1, &a2);
        assert!(sim > 0.9, "same source should be near-identical, got {sim}");
    }

    #[test]
    fn distinct_sources_low_similarity() {
        let model = FbankModel::new(&ModelParams::default());
        let a = model.embed(&harmonic_pcm(180.0, 32000)).unwrap();
        let b = model.embed(&harmonic_pcm(1500.0, 32000)).unwrap();
        let sim = cosine_sim(&a, &b);
        assert!(sim < 0.5, "distinct sources should not match, got {sim}");
    }

    #[test]
    fn cosine_sim_basics() {
        assert!((cosine_sim(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_sim(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_sim(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_sim(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }
}
