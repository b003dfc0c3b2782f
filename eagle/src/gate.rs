//! Enrollment audio quality gates.
//!
//! A chunk of enrollment audio is inspected over 10 ms sub-windows before any
//! of it is fused into the voiceprint. The verdict becomes the feedback cause
//! reported to the caller when a chunk does not advance enrollment.

/// Sub-window length used for the energy scan (10 ms at 16 kHz).
const SUBFRAME_SAMPLES: usize = 160;

/// RMS level (full scale = 1.0) above which a sub-window counts as voiced.
const VOICE_RMS: f64 = 0.01;

/// Samples at or beyond this magnitude count as clipped.
const CLIP_MAGNITUDE: u16 = 32700;

/// Chunks with more than this fraction of clipped samples are rejected.
const MAX_CLIP_RATIO: f64 = 0.01;

/// Minimum ratio of voiced level to background level (~6 dB).
const MIN_SNR_RATIO: f64 = 2.0;

/// Background sub-windows needed before the SNR estimate is trusted (100 ms).
const MIN_NOISE_SUBFRAMES: usize = 10;

/// Minimum voiced audio per chunk that is worth fusing (0.5 s at 16 kHz).
const MIN_VOICED_SAMPLES: usize = 8000;

/// Outcome of the quality scan, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateVerdict {
    /// Chunk is usable; voiced portion may be fused.
    Ok,
    /// No sub-window carries voice energy.
    NoVoice,
    /// Clipping or poor voiced-to-background ratio.
    Quality,
    /// Voice is present but too little of it to fuse safely.
    TooShort,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GateReport {
    pub verdict: GateVerdict,
    /// Number of samples in voiced sub-windows.
    pub voiced_samples: usize,
}

/// Scans a chunk of PCM and reports whether it is fit for enrollment.
pub(crate) fn inspect(pcm: &[i16]) -> GateReport {
    if pcm.is_empty() {
        return GateReport { verdict: GateVerdict::NoVoice, voiced_samples: 0 };
    }

    let clipped = pcm.iter().filter(|s| s.unsigned_abs() >= CLIP_MAGNITUDE).count();
    if clipped as f64 / pcm.len() as f64 > MAX_CLIP_RATIO {
        return GateReport { verdict: GateVerdict::Quality, voiced_samples: 0 };
    }

    let mut voiced_subframes = 0usize;
    let mut voiced_level = 0.0f64;
    let mut noise_subframes = 0usize;
    let mut noise_level = 0.0f64;

    for window in pcm.chunks_exact(SUBFRAME_SAMPLES) {
        let energy: f64 = window
            .iter()
            .map(|&s| {
                let x = s as f64 / 32768.0;
                x * x
            })
            .sum();
        let rms = (energy / SUBFRAME_SAMPLES as f64).sqrt();
        if rms > VOICE_RMS {
            voiced_subframes += 1;
            voiced_level += rms;
        } else {
            noise_subframes += 1;
            noise_level += rms;
        }
    }

    if voiced_subframes == 0 {
        return GateReport { verdict: GateVerdict::NoVoice, voiced_samples: 0 };
    }

    let voiced_samples = voiced_subframes * SUBFRAME_SAMPLES;

    // The background level is only meaningful with enough quiet sub-windows.
    if noise_subframes >= MIN_NOISE_SUBFRAMES {
        let voiced_rms = voiced_level / voiced_subframes as f64;
        let noise_rms = (noise_level / noise_subframes as f64).max(1e-6);
        if voiced_rms / noise_rms < MIN_SNR_RATIO {
            return GateReport { verdict: GateVerdict::Quality, voiced_samples };
        }
    }

    if voiced_samples < MIN_VOICED_SAMPLES {
        return GateReport { verdict: GateVerdict::TooShort, voiced_samples };
    }

    GateReport { verdict: GateVerdict::Ok, voiced_samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine_pcm(freq_hz: f64, amplitude: f64, n_samples: usize) -> Vec<i16> {
        (0..n_samples)
            .map(|i| {
                let t = i as f64 / 16000.0;
                (amplitude * (freq_hz * 2.0 * PI * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn silence_has_no_voice() {
        let report = inspect(&vec![0i16; 16000]);
        assert_eq!(report.verdict, GateVerdict::NoVoice);
        assert_eq!(report.voiced_samples, 0);
    }

    #[test]
    fn clean_tone_passes() {
        let report = inspect(&sine_pcm(440.0, 7000.0, 16000));
        assert_eq!(report.verdict, GateVerdict::Ok);
        assert_eq!(report.voiced_samples, 16000);
    }

    #[test]
    fn clipped_audio_is_quality_issue() {
        // Full-scale square wave: every sample clipped.
        let pcm: Vec<i16> = (0..16000)
            .map(|i| if (i / 40) % 2 == 0 { 32767 } else { -32767 })
            .collect();
        assert_eq!(inspect(&pcm).verdict, GateVerdict::Quality);
    }

    #[test]
    fn low_snr_is_quality_issue() {
        // Alternating 10 ms blocks: voiced level barely above a loud
        // background level, well under the 6 dB floor.
        // 500 Hz has a 32-sample period, so each 160-sample block holds
        // exactly 5 periods and block RMS is amplitude / sqrt(2).
        let mut pcm = Vec::with_capacity(32000);
        for block in 0..200 {
            let amp = if block % 2 == 0 { 600.0 } else { 420.0 };
            pcm.extend(sine_pcm(500.0, amp, 160));
        }
        assert_eq!(inspect(&pcm).verdict, GateVerdict::Quality);
    }

    #[test]
    fn quiet_background_does_not_trip_snr() {
        // Half tone, half digital silence: background RMS ~0.
        let mut pcm = sine_pcm(440.0, 7000.0, 16000);
        pcm.extend(std::iter::repeat(0i16).take(16000));
        let report = inspect(&pcm);
        assert_eq!(report.verdict, GateVerdict::Ok);
        assert_eq!(report.voiced_samples, 16000);
    }

    #[test]
    fn sparse_voice_is_too_short() {
        // 0.4 s of tone inside 1 s of audio: voiced but below the fuse floor.
        let mut pcm = sine_pcm(440.0, 7000.0, 6400);
        pcm.extend(std::iter::repeat(0i16).take(9600));
        let report = inspect(&pcm);
        assert_eq!(report.verdict, GateVerdict::TooShort);
        assert_eq!(report.voiced_samples, 6400);
    }

    #[test]
    fn empty_chunk_is_no_voice() {
        assert_eq!(inspect(&[]).verdict, GateVerdict::NoVoice);
    }
}
