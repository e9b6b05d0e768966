//! Mix pipeline — voice + optional background music → WAV and MP3.
//!
//! ## Stages
//! 1. **Transform** — speed/pitch via [`transform`](crate::transform::transform).
//! 2. **Normalise** — resample to [`CANONICAL_RATE`].
//! 3. **Delay** — prepend `start_delay_ms` of silence.
//! 4. **Music** — decode, apply gain, loop whole copies until long enough,
//!    truncate to the padded voice length, 300 ms fade-in.
//! 5. **Overlay** — add music onto the voice at frame 0.
//! 6. **Fade-out** — 400 ms at the end of the mix.
//! 7. **Export** — 16-bit WAV and 192 kbit/s MP3.
//!
//! A missing or nonexistent music path means "voice only", not an error.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        decode::decode_file,
        encode::{encode_mp3, encode_wav},
        resample::resample,
        AudioBuffer, CANONICAL_RATE,
    },
    error::CallbenchError,
    request::AnnouncementRequest,
    transform::transform,
};

/// Fade-in applied to the start of the background music.
pub const MUSIC_FADE_IN_MS: u64 = 300;

/// Fade-out applied to the end of the final mix.
pub const MIX_FADE_OUT_MS: u64 = 400;

/// Numeric mix parameters, taken from an [`AnnouncementRequest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixParams {
    pub start_delay_ms: u32,
    pub music_gain_db: i32,
    pub speed_factor: f64,
    pub pitch_semitones: f64,
}

impl Default for MixParams {
    fn default() -> Self {
        Self { start_delay_ms: 0, music_gain_db: 0, speed_factor: 1.0, pitch_semitones: 0.0 }
    }
}

impl From<&AnnouncementRequest> for MixParams {
    fn from(req: &AnnouncementRequest) -> Self {
        Self {
            start_delay_ms: req.start_delay_ms,
            music_gain_db: req.music_gain_db,
            speed_factor: req.speed_factor,
            pitch_semitones: req.pitch_semitones,
        }
    }
}

/// Encoded outputs of one mix.
#[derive(Debug, Clone)]
pub struct MixOutput {
    pub wav: Vec<u8>,
    pub mp3: Vec<u8>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// Speed/pitch, canonical rate, then the start delay.
fn prepare_voice(voice: AudioBuffer, params: &MixParams) -> Result<AudioBuffer> {
    let voice = transform(voice, params.speed_factor, params.pitch_semitones)
        .context("Voice speed/pitch adjustment failed")?;
    let voice = resample(&voice, CANONICAL_RATE).context("Voice rate conversion failed")?;
    let pad = AudioBuffer::silent(u64::from(params.start_delay_ms), CANONICAL_RATE, voice.channels);
    Ok(pad.concat(&voice))
}

/// Fit `music` to exactly `frames` frames: whole-buffer repeats when it is
/// shorter, then truncation, then the fade-in.
pub fn fit_music(music: &AudioBuffer, frames: usize) -> AudioBuffer {
    let looped = if music.frames() < frames {
        let times = frames.div_ceil(music.frames());
        debug!(times, "looping background music");
        music.repeat(times)
    } else {
        music.clone()
    };
    looped.truncate_frames(frames).fade_in(MUSIC_FADE_IN_MS)
}

/// Decode, level and fit the background music to `frames` frames.
///
/// Returns `None` when there is nothing to overlay.
fn prepare_music(path: &Path, gain_db: i32, frames: usize) -> Result<Option<AudioBuffer>> {
    let music = decode_file(path)?;
    let music = resample(&music, CANONICAL_RATE).context("Music rate conversion failed")?;
    if music.is_empty() {
        warn!(path = %path.display(), "music file contains no audio, mixing voice only");
        return Ok(None);
    }
    let music = music.gain_db(f64::from(gain_db));
    Ok(Some(fit_music(&music, frames)))
}

fn mix_inner(voice: AudioBuffer, music: Option<&Path>, params: &MixParams) -> Result<AudioBuffer> {
    let voice = prepare_voice(voice, params)?;
    info!(ms = voice.duration_ms(), delay_ms = params.start_delay_ms, "voice prepared");

    let music = match music {
        Some(path) if path.exists() => prepare_music(path, params.music_gain_db, voice.frames())?,
        Some(path) => {
            warn!(path = %path.display(), "music file not found, mixing voice only");
            None
        }
        None => None,
    };

    let mix = match music {
        Some(music) => voice.overlay(&music),
        None => voice,
    };
    Ok(mix.fade_out(MIX_FADE_OUT_MS))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Run stages 1–6 and return the final mix at [`CANONICAL_RATE`].
pub fn mix(
    voice: AudioBuffer,
    music: Option<&Path>,
    params: &MixParams,
) -> Result<AudioBuffer, CallbenchError> {
    mix_inner(voice, music, params).map_err(CallbenchError::Mix)
}

/// Encode a finished mix as WAV and MP3.
pub fn export(mix: &AudioBuffer) -> Result<MixOutput, CallbenchError> {
    let wav = encode_wav(mix).map_err(CallbenchError::Mix)?;
    let mp3 = encode_mp3(mix).map_err(CallbenchError::Mix)?;
    Ok(MixOutput { wav, mp3 })
}

/// Mix and export in one call.
pub fn render(
    voice: AudioBuffer,
    music: Option<&Path>,
    params: &MixParams,
) -> Result<MixOutput, CallbenchError> {
    let mixed = mix(voice, music, params)?;
    export(&mixed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
