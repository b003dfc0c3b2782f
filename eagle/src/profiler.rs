//! Enrollment state machine.
//!
//! An [`EagleProfiler`] accumulates voiced evidence across enroll calls,
//! fusing each accepted chunk's embedding into a running voiceprint. The
//! completeness percentage grows monotonically with accepted voiced audio
//! and reaches 100 once the model's enrollment target is covered, at which
//! point the voiceprint can be exported as an [`EagleProfile`].

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::EagleError;
use crate::gate::{self, GateVerdict};
use crate::license;
use crate::model::{cosine_sim, l2_normalize, FbankModel, SpeakerModel};
use crate::params::ModelParams;
use crate::profile::EagleProfile;
use crate::EagleConfig;

/// Minimum cosine similarity between a chunk and the accumulated voiceprint
/// for the chunk to be attributed to the same speaker.
const SPEAKER_MATCH_THRESHOLD: f32 = 0.5;

/// Advisory reason reported alongside the enrollment percentage.
///
/// Feedback is not an error: the enroll call succeeded, and the code explains
/// why the chunk did or did not advance enrollment. It reflects only the most
/// recent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollFeedback {
    /// The chunk was usable and was fused into the voiceprint.
    AudioOk = 0,
    /// The chunk carries too little voiced audio to fuse safely.
    AudioTooShort = 1,
    /// The chunk's voice does not match the previously accumulated evidence.
    UnknownSpeaker = 2,
    /// The chunk is silent or its signal-to-noise ratio is too low.
    NoVoiceFound = 3,
    /// Voice is present but clipped, noisy, or otherwise too degraded.
    QualityIssue = 4,
}

impl fmt::Display for EnrollFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioOk => write!(f, "audio_ok"),
            Self::AudioTooShort => write!(f, "audio_too_short"),
            Self::UnknownSpeaker => write!(f, "unknown_speaker"),
            Self::NoVoiceFound => write!(f, "no_voice_found"),
            Self::QualityIssue => write!(f, "quality_issue"),
        }
    }
}

struct ProfilerInner {
    /// Voiced-length-weighted sum of accepted chunk embeddings.
    sum: Vec<f32>,
    /// Total voiced samples of accepted evidence.
    voiced_total: u64,
    closed: bool,
}

/// Stateful enrollment session that builds an [`EagleProfile`].
///
/// All methods take `&self`; calls on one instance are serialized through an
/// internal lock, so an instance may be shared across threads.
pub struct EagleProfiler {
    params: ModelParams,
    model: Arc<dyn SpeakerModel>,
    inner: RwLock<ProfilerInner>,
}

impl EagleProfiler {
    /// Creates a profiler with the built-in embedding backend.
    pub fn new(config: EagleConfig) -> Result<Self, EagleError> {
        let model = Arc::new(FbankModel::new(&config.model));
        Self::with_model(config, model)
    }

    /// Creates a profiler with a custom embedding backend.
    pub fn with_model(
        config: EagleConfig,
        model: Arc<dyn SpeakerModel>,
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

        debug!(
            sample_rate = params.sample_rate,
            min_enroll_samples = params.min_enroll_samples,
            enroll_target_samples = params.enroll_target_samples,
            "profiler initialized"
        );

        let dim = params.embedding_dim as usize;
        Ok(Self {
            params,
            model,
            inner: RwLock::new(ProfilerInner {
                sum: vec![0.0; dim],
                voiced_total: 0,
                closed: false,
            }),
        })
    }

    /// Feeds a chunk of enrollment audio.
    ///
    /// Returns the completeness percentage in `[0, 100]` together with the
    /// feedback code for this chunk. The percentage never decreases within a
    /// session; only [`EagleProfiler::reset`] returns it to 0. Call
    /// repeatedly with utterances of the same speaker until the percentage
    /// reaches 100, then [`EagleProfiler::export`] the profile.
    ///
    /// The chunk must be single-channel 16-bit PCM at
    /// [`EagleProfiler::sample_rate`] and contain at least
    /// [`EagleProfiler::min_enroll_samples`] samples.
    pub fn enroll(&self, pcm: &[i16]) -> Result<(f32, EnrollFeedback), EagleError> {
        let mut inner = self.inner.write().unwrap();
        if inner.closed {
            return Err(EagleError::InvalidState("profiler has been deleted".into()));
        }
        if pcm.len() < self.params.min_enroll_samples as usize {
            return Err(EagleError::InvalidArgument(format!(
                "enrollment audio must contain at least {} samples, got {}",
                self.params.min_enroll_samples,
                pcm.len()
            )));
        }

        let percentage = self.percentage_of(&inner);

        let report = gate::inspect(pcm);
        let feedback = match report.verdict {
            GateVerdict::NoVoice => Some(EnrollFeedback::NoVoiceFound),
            GateVerdict::Quality => Some(EnrollFeedback::QualityIssue),
            GateVerdict::TooShort => Some(EnrollFeedback::AudioTooShort),
            GateVerdict::Ok => None,
        };
        if let Some(feedback) = feedback {
            debug!(%feedback, "enrollment chunk rejected by quality gate");
            return Ok((percentage, feedback));
        }

        let embedding = self.model.embed(pcm)?;

        if inner.voiced_total > 0 {
            let mut voiceprint = inner.sum.clone();
            l2_normalize(&mut voiceprint);
            let similarity = cosine_sim(&embedding, &voiceprint);
            if similarity < SPEAKER_MATCH_THRESHOLD {
                debug!(similarity, "enrollment chunk does not match accumulated speaker");
                return Ok((percentage, EnrollFeedback::UnknownSpeaker));
            }
        }

        let weight = report.voiced_samples as f32;
        for (acc, &v) in inner.sum.iter_mut().zip(embedding.iter()) {
            *acc += weight * v;
        }
        inner.voiced_total += report.voiced_samples as u64;

        let percentage = self.percentage_of(&inner);
        debug!(percentage, voiced_samples = report.voiced_samples, "enrollment chunk accepted");
        Ok((percentage, EnrollFeedback::AudioOk))
    }

    /// Exports the voiceprint of the current session.
    ///
    /// Fails with [`EagleError::InvalidState`] until enrollment reaches 100%.
    pub fn export(&self) -> Result<EagleProfile, EagleError> {
        let inner = self.inner.read().unwrap();
        if inner.closed {
            return Err(EagleError::InvalidState("profiler has been deleted".into()));
        }
        if self.percentage_of(&inner) < 100.0 {
            return Err(EagleError::InvalidState(
                "enrollment is not complete; keep enrolling until the percentage reaches 100".into(),
            ));
        }

        let mut voiceprint = inner.sum.clone();
        l2_normalize(&mut voiceprint);
        Ok(EagleProfile::from_embedding(&voiceprint))
    }

    /// Discards all accumulated enrollment data and returns the percentage
    /// to 0. Must be called before enrolling a different speaker on the same
    /// instance.
    pub fn reset(&self) -> Result<(), EagleError> {
        let mut inner = self.inner.write().unwrap();
        if inner.closed {
            return Err(EagleError::InvalidState("profiler has been deleted".into()));
        }
        inner.sum.fill(0.0);
        inner.voiced_total = 0;
        debug!("profiler reset");
        Ok(())
    }

    /// Releases the instance. All subsequent operations fail with
    /// [`EagleError::InvalidState`]. Idempotent.
    pub fn delete(&self) {
        let mut inner = self.inner.write().unwrap();
        if !inner.closed {
            inner.closed = true;
            inner.sum = Vec::new();
            inner.voiced_total = 0;
        }
    }

    /// Minimum number of samples accepted by [`EagleProfiler::enroll`].
    pub fn min_enroll_samples(&self) -> usize {
        self.params.min_enroll_samples as usize
    }

    /// Audio sample rate accepted by [`EagleProfiler::enroll`].
    pub fn sample_rate(&self) -> usize {
        self.params.sample_rate as usize
    }

    /// Size in bytes of the profile produced by [`EagleProfiler::export`].
    pub fn export_size(&self) -> usize {
        EagleProfile::size_for_dim(self.params.embedding_dim as usize)
    }

    /// Engine version.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn percentage_of(&self, inner: &ProfilerInner) -> f32 {
        let ratio = inner.voiced_total as f64 / self.params.enroll_target_samples as f64;
        (ratio * 100.0).min(100.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn speaker_pcm(base_hz: f64, n_samples: usize) -> Vec<i16> {
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

    fn test_config() -> EagleConfig {
        EagleConfig {
            access_key: "testAccessKey01".into(),
            model: ModelParams::default(),
        }
    }

    fn new_profiler() -> EagleProfiler {
        EagleProfiler::new(test_config()).unwrap()
    }

    #[test]
    fn rejects_bad_access_key() {
        let mut cfg = test_config();
        cfg.access_key = String::new();
        assert!(matches!(
            EagleProfiler::new(cfg),
            Err(EagleError::InvalidArgument(_))
        ));

        let mut cfg = test_config();
        cfg.access_key = "no spaces allowed".into();
        assert!(matches!(
            EagleProfiler::new(cfg),
            Err(EagleError::Activation(_))
        ));
    }

    #[test]
    fn rejects_sub_window_model_params() {
        let mut cfg = test_config();
        cfg.model.min_enroll_samples = 100;
        assert!(matches!(
            EagleProfiler::new(cfg),
            Err(EagleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn getters_follow_model_params() {
        let p = new_profiler();
        assert_eq!(p.min_enroll_samples(), 16000);
        assert_eq!(p.sample_rate(), 16000);
        assert_eq!(p.export_size(), 8 + 4 * 160);
        assert!(!p.version().is_empty());
    }

    #[test]
    fn short_chunk_is_invalid_argument() {
        let p = new_profiler();
        let err = p.enroll(&speaker_pcm(180.0, 100)).unwrap_err();
        assert!(matches!(err, EagleError::InvalidArgument(_)));
        // The failed call must not corrupt the session.
        let (pct, feedback) = p.enroll(&speaker_pcm(180.0, 32000)).unwrap();
        assert_eq!(feedback, EnrollFeedback::AudioOk);
        assert!(pct > 0.0);
    }

    #[test]
    fn percentage_grows_monotonically_to_completion() {
        let p = new_profiler();
        let chunk = speaker_pcm(180.0, 32000); // 2 s, fully voiced

        let mut last = 0.0f32;
        for _ in 0..5 {
            let (pct, feedback) = p.enroll(&chunk).unwrap();
            assert_eq!(feedback, EnrollFeedback::AudioOk);
            assert!(pct >= last, "percentage regressed: {pct} < {last}");
            last = pct;
        }
        assert!((last - 100.0).abs() < 1e-3, "expected completion, got {last}");

        // Further enrollment keeps refining without exceeding 100.
        let (pct, feedback) = p.enroll(&chunk).unwrap();
        assert_eq!(feedback, EnrollFeedback::AudioOk);
        assert!((pct - 100.0).abs() < 1e-3);
    }

    #[test]
    fn silence_reports_no_voice_without_progress() {
        let p = new_profiler();
        p.enroll(&speaker_pcm(180.0, 32000)).unwrap();

        let (pct, feedback) = p.enroll(&vec![0i16; 32000]).unwrap();
        assert_eq!(feedback, EnrollFeedback::NoVoiceFound);
        assert!((pct - 20.0).abs() < 1e-3, "silence must not advance enrollment");
    }

    #[test]
    fn clipped_chunk_reports_quality_issue() {
        let p = new_profiler();
        let clipped: Vec<i16> = (0..32000)
            .map(|i| if (i / 40) % 2 == 0 { 32767 } else { -32767 })
            .collect();
        let (pct, feedback) = p.enroll(&clipped).unwrap();
        assert_eq!(feedback, EnrollFeedback::QualityIssue);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn sparse_voice_reports_audio_too_short() {
        let p = new_profiler();
        // Exactly min length, but only 0.4 s of it is voiced.
        let mut pcm = speaker_pcm(180.0, 6400);
        pcm.extend(std::iter::repeat(0i16).take(9600));
        let (pct, feedback) = p.enroll(&pcm).unwrap();
        assert_eq!(feedback, EnrollFeedback::AudioTooShort);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn different_speaker_reports_unknown_speaker() {
        let p = new_profiler();
        let (pct_a, _) = p.enroll(&speaker_pcm(180.0, 32000)).unwrap();

        let (pct, feedback) = p.enroll(&speaker_pcm(1500.0, 32000)).unwrap();
        assert_eq!(feedback, EnrollFeedback::UnknownSpeaker);
        assert_eq!(pct, pct_a, "mismatched speaker must not advance enrollment");

        // The original speaker still enrolls normally afterwards.
        let (pct, feedback) = p.enroll(&speaker_pcm(180.0, 32000)).unwrap();
        assert_eq!(feedback, EnrollFeedback::AudioOk);
        assert!(pct > pct_a);
    }

    #[test]
    fn export_before_completion_is_invalid_state() {
        let p = new_profiler();
        assert!(matches!(p.export(), Err(EagleError::InvalidState(_))));

        p.enroll(&speaker_pcm(180.0, 32000)).unwrap();
        assert!(matches!(p.export(), Err(EagleError::InvalidState(_))));
    }

    #[test]
    fn export_after_completion() {
        let p = new_profiler();
        let chunk = speaker_pcm(180.0, 32000);
        for _ in 0..5 {
            p.enroll(&chunk).unwrap();
        }
        let profile = p.export().unwrap();
        assert_eq!(profile.size(), p.export_size());

        // Export is repeatable and the profile outlives the profiler.
        let again = p.export().unwrap();
        assert_eq!(profile, again);
        p.delete();
        assert_eq!(profile.size(), 8 + 4 * 160);
    }

    #[test]
    fn reset_allows_enrolling_a_new_speaker() {
        let p = new_profiler();
        let chunk_a = speaker_pcm(180.0, 32000);
        for _ in 0..5 {
            p.enroll(&chunk_a).unwrap();
        }
        p.reset().unwrap();

        // A different speaker now enrolls from scratch, no unknown-speaker
        // feedback and percentage restarting from zero.
        let chunk_b = speaker_pcm(1500.0, 32000);
        let mut last = 0.0f32;
        for _ in 0..5 {
            let (pct, feedback) = p.enroll(&chunk_b).unwrap();
            assert_eq!(feedback, EnrollFeedback::AudioOk);
            last = pct;
        }
        assert!((last - 100.0).abs() < 1e-3);
        assert!(p.export().is_ok());
    }

    #[test]
    fn deleted_profiler_reports_invalid_state() {
        let p = new_profiler();
        p.delete();
        p.delete(); // idempotent

        assert!(matches!(
            p.enroll(&speaker_pcm(180.0, 32000)),
            Err(EagleError::InvalidState(_))
        ));
        assert!(matches!(p.export(), Err(EagleError::InvalidState(_))));
        assert!(matches!(p.reset(), Err(EagleError::InvalidState(_))));
    }

    #[test]
    fn feedback_display() {
        assert_eq!(EnrollFeedback::AudioOk.to_string(), "audio_ok");
        assert_eq!(EnrollFeedback::AudioTooShort.to_string(), "audio_too_short");
        assert_eq!(EnrollFeedback::UnknownSpeaker.to_string(), "unknown_speaker");
        assert_eq!(EnrollFeedback::NoVoiceFound.to_string(), "no_voice_found");
        assert_eq!(EnrollFeedback::QualityIssue.to_string(), "quality_issue");
    }
}
