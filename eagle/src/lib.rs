//! Text-independent speaker enrollment and recognition.
//!
//! # Architecture
//!
//! Two state machines share one embedding backend:
//!
//! 1. [`EagleProfiler`]: enrollment audio -> quality gates -> fused
//!    voiceprint, exported as an [`EagleProfile`] once 100% complete
//! 2. [`Eagle`]: fixed-length PCM frames -> rolling acoustic context ->
//!    one similarity score per enrolled profile, each in `[0, 1]`
//!
//! Both are constructed from an [`EagleConfig`] carrying the AccessKey and
//! the model parameter blob ([`ModelParams`]); there is no process-global
//! state. The acoustic front-end behind both machines is the
//! [`SpeakerModel`] trait, with a deterministic log-mel-statistics backend
//! ([`FbankModel`]) built in.
//!
//! # Audio requirements
//!
//! - Format: 16-bit linearly-encoded PCM
//! - Channels: 1 (mono)
//! - Sample rate: per [`ModelParams::sample_rate`] (default 16 kHz)
//!
//! # Thread safety
//!
//! Instances are `Send + Sync`; every operation takes `&self` and calls on
//! one instance are serialized internally, so at most one operation is in
//! flight per instance.

mod engine;
mod error;
mod gate;
mod license;
mod model;
mod params;
mod profile;
mod profiler;

pub use engine::Eagle;
pub use error::EagleError;
pub use model::{FbankModel, SpeakerModel};
pub use params::ModelParams;
pub use profile::EagleProfile;
pub use profiler::{EagleProfiler, EnrollFeedback};

use std::fmt;

/// Construction-time configuration shared by [`EagleProfiler`] and
/// [`Eagle`].
#[derive(Clone)]
pub struct EagleConfig {
    /// Opaque entitlement token, validated once at construction.
    pub access_key: String,
    /// Model-derived constants, typically loaded via
    /// [`ModelParams::from_file`].
    pub model: ModelParams,
}

impl EagleConfig {
    /// Creates a configuration with the default model parameters.
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            model: ModelParams::default(),
        }
    }
}

// The AccessKey is a credential; keep it out of debug logs.
impl fmt::Debug for EagleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagleConfig")
            .field("access_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}
