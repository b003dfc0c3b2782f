//! Versioned model parameter blob.
//!
//! The engine is constructed from a binary parameter file (`.pv` style):
//! a small self-describing header carrying the model-derived constants that
//! the rest of the engine treats as fixed (sample rate, frame length,
//! enrollment thresholds, feature/embedding geometry). Profiles produced
//! under one parameter version are rejected by engines built from another.

use std::path::Path;

use crate::error::EagleError;

const MAGIC: [u8; 4] = *b"EAGL";
const FORMAT_VERSION: u16 = 1;

/// Serialized size in bytes: magic + version + 4x u32 + 2x u16.
const BLOB_SIZE: usize = 4 + 2 + 4 * 4 + 2 * 2;

/// Shortest audio span the feature front-end can analyze: one 25 ms
/// analysis window at 16 kHz. Frames and enrollment chunks must cover it.
const MIN_ANALYSIS_SAMPLES: u32 = 400;

/// Model-derived constants supplied at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParams {
    /// Required input sample rate in Hz.
    pub sample_rate: u32,
    /// Number of samples per recognition frame.
    pub frame_length: u32,
    /// Minimum number of samples accepted by a single enroll call.
    pub min_enroll_samples: u32,
    /// Voiced samples of accepted evidence needed to reach 100% enrollment.
    pub enroll_target_samples: u32,
    /// Mel filterbank channels used by the built-in feature front-end.
    pub num_mels: u16,
    /// Dimensionality of the speaker embedding.
    pub embedding_dim: u16,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_length: 512,
            min_enroll_samples: 16000,       // 1 s
            enroll_target_samples: 160_000,  // 10 s of voiced audio
            num_mels: 80,
            embedding_dim: 160,              // mean + stddev per mel bin
        }
    }
}

impl ModelParams {
    /// Reads and parses a parameter blob from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EagleError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parses a parameter blob.
    ///
    /// Fails with [`EagleError::InvalidArgument`] on truncation, bad magic,
    /// an unknown format version, or degenerate constants.
    pub fn from_bytes(data: &[u8]) -> Result<Self, EagleError> {
        if data.len() != BLOB_SIZE {
            return Err(EagleError::InvalidArgument(format!(
                "model parameter blob must be {BLOB_SIZE} bytes, got {}",
                data.len()
            )));
        }
        if data[0..4] != MAGIC {
            return Err(EagleError::InvalidArgument(
                "model parameter blob has invalid magic".into(),
            ));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != FORMAT_VERSION {
            return Err(EagleError::InvalidArgument(format!(
                "unsupported model parameter version {version}, expected {FORMAT_VERSION}"
            )));
        }

        let u32_at = |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
        let params = Self {
            sample_rate: u32_at(6),
            frame_length: u32_at(10),
            min_enroll_samples: u32_at(14),
            enroll_target_samples: u32_at(18),
            num_mels: u16::from_le_bytes([data[22], data[23]]),
            embedding_dim: u16::from_le_bytes([data[24], data[25]]),
        };
        params.validate()?;
        Ok(params)
    }

    /// Serializes the parameters into the blob format accepted by
    /// [`ModelParams::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BLOB_SIZE);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&self.frame_length.to_le_bytes());
        out.extend_from_slice(&self.min_enroll_samples.to_le_bytes());
        out.extend_from_slice(&self.enroll_target_samples.to_le_bytes());
        out.extend_from_slice(&self.num_mels.to_le_bytes());
        out.extend_from_slice(&self.embedding_dim.to_le_bytes());
        out
    }

    pub(crate) fn validate(&self) -> Result<(), EagleError> {
        if self.sample_rate == 0
            || self.frame_length == 0
            || self.min_enroll_samples == 0
            || self.num_mels == 0
            || self.embedding_dim == 0
        {
            return Err(EagleError::InvalidArgument(
                "model parameters contain zero-valued constants".into(),
            ));
        }
        if self.frame_length < MIN_ANALYSIS_SAMPLES
            || self.min_enroll_samples < MIN_ANALYSIS_SAMPLES
        {
            return Err(EagleError::InvalidArgument(format!(
                "frame length and minimum enroll length must cover one analysis window ({MIN_ANALYSIS_SAMPLES} samples)"
            )));
        }
        if self.enroll_target_samples < self.min_enroll_samples {
            return Err(EagleError::InvalidArgument(
                "enrollment target must be at least the minimum enroll length".into(),
            ));
        }
        Ok(())
    }
}
