//! Voice transformer — speed and pitch by sample-rate reinterpretation.
//!
//! The samples are left untouched while the buffer's nominal rate is changed
//! to `rate × factor`, then the buffer is resampled back to
//! [`CANONICAL_RATE`]. Duration and pitch therefore move together: a factor
//! of 1.1 plays 10 % faster *and* higher. This is not a time-stretch.

use anyhow::Result;
use tracing::debug;

use crate::audio::{resample::resample, AudioBuffer, CANONICAL_RATE};

/// Frequency ratio of `semitones` equal-tempered semitones.
pub fn semitone_factor(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

/// Pretend `audio` was recorded at `rate × factor` Hz, then resample to the
/// canonical rate.
fn reinterpret(audio: AudioBuffer, factor: f64) -> Result<AudioBuffer> {
    let rate = (f64::from(audio.sample_rate) * factor).floor().max(1.0) as u32;
    debug!(from = audio.sample_rate, to = rate, factor, "reinterpreting sample rate");
    let relabelled = AudioBuffer { sample_rate: rate, ..audio };
    resample(&relabelled, CANONICAL_RATE)
}

/// Apply `speed_factor` (1.0 = unchanged) and then `pitch_semitones`
/// (0 = unchanged).
///
/// With both at their defaults the buffer is returned as is, at its
/// original rate. Otherwise the result is at [`CANONICAL_RATE`].
pub fn transform(audio: AudioBuffer, speed_factor: f64, pitch_semitones: f64) -> Result<AudioBuffer> {
    let mut audio = audio;
    if speed_factor != 1.0 {
        audio = reinterpret(audio, speed_factor)?;
    }
    if pitch_semitones != 0.0 {
        audio = reinterpret(audio, semitone_factor(pitch_semitones))?;
    }
    Ok(audio)
}
