//! Streaming speaker recognition engine.
//!
//! An [`Eagle`] instance is built from one or more exported profiles and
//! consumes fixed-length audio frames. Each call scores the current acoustic
//! context against every enrolled voiceprint; the context is a rolling window
//! over the most recent audio, which smooths estimates across frames.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::error::EagleError;
use crate::license;
use crate::model::{cosine_sim, l2_normalize, FbankModel, SpeakerModel};
use crate::params::ModelParams;
use crate::profile::EagleProfile;
use crate::EagleConfig;

/// Length of the rolling acoustic context in seconds.
const CONTEXT_SECONDS: u32 = 3;

struct EngineInner {
    /// Most recent audio, capped at [`CONTEXT_SECONDS`].
    context: Vec<i16>,
    closed: bool,
}

/// Text-independent speaker recognition engine.
///
/// Emits one similarity score per enrolled profile for every processed frame,
/// in profile order, each in `[0, 1]` with 1 a perfect match. All methods
/// take `&self` and serialize through an internal lock.
pub struct Eagle {
    params: ModelParams,
    model: Arc<dyn SpeakerModel>,
    voiceprints: Vec<Vec<f32>>,
    inner: RwLock<EngineInner>,
}

impl Eagle {
    /// Creates an engine with the built-in embedding backend.
    ///
    /// Requires at least one profile; profiles that are malformed or were
    /// produced under an incompatible model version fail with
    /// [`EagleError::InvalidArgument`].
    pub fn new(config: EagleConfig, profiles: &[EagleProfile]) -> Result<Self, EagleError> {
        let model = Arc::new(FbankModel::new(&config.model));
        Self::with_model(config, model, profiles)
    }

    /// Creates an engine with a custom embedding backend.
    pub fn with_model(
        config: EagleConfig,
        model: Arc<dyn SpeakerModel>,
        profiles: &[EagleProfile],
    ) -> Result<Self, EagleError> {
        license::validate_access_key(&config.access_key)?;
        let params = config.model;
        params.validate()?;
        if model.dimension() != params.embedding_dim as usize {
            return Err(EagleError::InvalidArgument(format!(
                "embedding backend dimension {} does not match model parameters ({})",
                model.dimension(),
                params.embedding_dim
            )));
        }
        if profiles.is_empty() {
            return Err(EagleError::InvalidArgument(
                "at least one speaker profile is required".into(),
            ));
        }

        let dim = params.embedding_dim as usize;
        let mut voiceprints = Vec::with_capacity(profiles.len());
        for (i, profile) in profiles.iter().enumerate() {
            let mut voiceprint = profile
                .decode(dim)
                .map_err(|msg| EagleError::InvalidArgument(format!("speaker profile {i}: {msg}")))?;
            l2_normalize(&mut voiceprint);
            voiceprints.push(voiceprint);
        }

        debug!(
            num_speakers = voiceprints.len(),
            frame_length = params.frame_length,
            "engine initialized"
        );

        Ok(Self {
            params,
            model,
            voiceprints,
            inner: RwLock::new(EngineInner { context: Vec::new(), closed: false }),
        })
    }

    /// Processes one frame of audio and returns a similarity score per
    /// enrolled profile, in the order the profiles were supplied.
    ///
    /// The frame must contain exactly [`Eagle::frame_length`] samples of
    /// single-channel 16-bit PCM at [`Eagle::sample_rate`].
    pub fn process(&self, pcm: &[i16]) -> Result<Vec<f32>, EagleError> {
        let mut inner = self.inner.write().unwrap();
        if inner.closed {
            return Err(EagleError::InvalidState("engine has been deleted".into()));
        }
        let frame_length = self.params.frame_length as usize;
        if pcm.len() != frame_length {
            return Err(EagleError::InvalidArgument(format!(
                "frame must contain exactly {frame_length} samples, got {}",
                pcm.len()
            )));
        }

        // Stage the updated context; a failed embed must not consume the frame.
        let cap = (self.params.sample_rate * CONTEXT_SECONDS) as usize;
        let mut context = inner.context.clone();
        context.extend_from_slice(pcm);
        if context.len() > cap {
            let excess = context.len() - cap;
            context.drain(..excess);
        }

        let embedding = self.model.embed(&context)?;
        inner.context = context;
        let scores: Vec<f32> = self
            .voiceprints
            .iter()
            .map(|v| cosine_sim(&embedding, v).clamp(0.0, 1.0))
            .collect();

        trace!(context_samples = inner.context.len(), ?scores, "frame processed");
        Ok(scores)
    }

    /// Clears the streaming context without unloading profiles. Call when
    /// starting a logically new audio session with the same speaker set.
    pub fn reset(&self) -> Result<(), EagleError> {
        let mut inner = self.inner.write().unwrap();
        if inner.closed {
            return Err(EagleError::InvalidState("engine has been deleted".into()));
        }
        inner.context.clear();
        debug!("engine reset");
        Ok(())
    }

    /// Releases the instance. All subsequent operations fail with
    /// [`EagleError::InvalidState`]. Idempotent.
    pub fn delete(&self) {
        let mut inner = self.inner.write().unwrap();
        if !inner.closed {
            inner.closed = true;
            inner.context = Vec::new();
        }
    }

    /// Number of samples per frame expected by [`Eagle::process`].
    pub fn frame_length(&self) -> usize {
        self.params.frame_length as usize
    }

    /// Audio sample rate accepted by [`Eagle::process`].
    pub fn sample_rate(&self) -> usize {
        self.params.sample_rate as usize
    }

    /// Number of enrolled speaker profiles.
    pub fn num_speakers(&self) -> usize {
        self.voiceprints.len()
    }

    /// Engine version.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

impl fmt::Debug for Eagle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eagle")
            .field("num_speakers", &self.voiceprints.len())
            .field("frame_length", &self.params.frame_length)
            .field("sample_rate", &self.params.sample_rate)
            .finish_non_exhaustive()
    }
}
