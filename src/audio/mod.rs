//! In-memory audio buffers and the sample-level operations the mixer needs.
//!
//! Samples are interleaved `f32` in `[-1.0, 1.0]`. Every operation returns a
//! new buffer; nothing is shared between pipeline stages.

pub mod decode;
pub mod encode;
pub mod resample;

/// Rate every buffer is normalised to before overlay and export.
pub const CANONICAL_RATE: u32 = 44_100;

/// Decoded PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, `frames() * channels` long.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Number of frames covering `ms` milliseconds at `rate` Hz, rounded.
pub fn ms_to_frames(ms: u64, rate: u32) -> usize {
    ((ms as f64 * f64::from(rate)) / 1000.0).round() as usize
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self { samples, sample_rate, channels }
    }

    /// `duration_ms` of digital silence.
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let frames = ms_to_frames(duration_ms, sample_rate);
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Duration in whole milliseconds, rounded.
    pub fn duration_ms(&self) -> u64 {
        (self.duration_secs() * 1000.0).round() as u64
    }

    // ── Channel layout ────────────────────────────────────────────────────────

    /// Convert to `channels` channels.
    ///
    /// Mono is duplicated into every output channel; anything else is
    /// averaged down to mono first.
    pub fn with_channels(&self, channels: u16) -> Self {
        if channels == self.channels {
            return self.clone();
        }
        let src = self.channels as usize;
        let mono: Vec<f32> = if src == 1 {
            self.samples.clone()
        } else {
            self.samples
                .chunks_exact(src)
                .map(|frame| frame.iter().sum::<f32>() / src as f32)
                .collect()
        };
        let samples = mono
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
            .collect();
        Self::new(samples, self.sample_rate, channels)
    }

    /// Split interleaved samples into one vector per channel.
    pub fn deinterleave(&self) -> Vec<Vec<f32>> {
        let n = self.channels as usize;
        let mut planes = vec![Vec::with_capacity(self.frames()); n];
        for frame in self.samples.chunks_exact(n) {
            for (plane, &s) in planes.iter_mut().zip(frame) {
                plane.push(s);
            }
        }
        planes
    }

    /// Inverse of [`deinterleave`](Self::deinterleave); planes are cut to the shortest.
    pub fn interleave(planes: &[Vec<f32>], sample_rate: u32) -> Self {
        let channels = planes.len().max(1);
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for plane in planes {
                samples.push(plane[i]);
            }
        }
        Self::new(samples, sample_rate, channels as u16)
    }

    // ── Time-domain editing ───────────────────────────────────────────────────

    /// `self` followed by `other`. Both must share rate and channel count.
    pub fn concat(&self, other: &AudioBuffer) -> Self {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        debug_assert_eq!(self.channels, other.channels);
        let mut samples = Vec::with_capacity(self.samples.len() + other.samples.len());
        samples.extend_from_slice(&self.samples);
        samples.extend_from_slice(&other.samples);
        Self::new(samples, self.sample_rate, self.channels)
    }

    /// Whole-buffer repetition, `times` copies back to back.
    pub fn repeat(&self, times: usize) -> Self {
        Self::new(self.samples.repeat(times), self.sample_rate, self.channels)
    }

    /// First `frames` frames (or the whole buffer if shorter).
    pub fn truncate_frames(&self, frames: usize) -> Self {
        let end = frames.min(self.frames()) * self.channels as usize;
        Self::new(self.samples[..end].to_vec(), self.sample_rate, self.channels)
    }

    // ── Level ─────────────────────────────────────────────────────────────────

    /// Scale by `db` decibels; negative values attenuate.
    pub fn gain_db(&self, db: f64) -> Self {
        let factor = 10f64.powf(db / 20.0) as f32;
        Self::new(
            self.samples.iter().map(|s| s * factor).collect(),
            self.sample_rate,
            self.channels,
        )
    }

    /// Linear ramp from silence to full level over the first `ms` milliseconds.
    pub fn fade_in(&self, ms: u64) -> Self {
        let len = ms_to_frames(ms, self.sample_rate).min(self.frames());
        let mut out = self.clone();
        if len == 0 {
            return out;
        }
        let ch = self.channels as usize;
        for (i, frame) in out.samples.chunks_exact_mut(ch).take(len).enumerate() {
            let g = i as f32 / len as f32;
            frame.iter_mut().for_each(|s| *s *= g);
        }
        out
    }

    /// Linear ramp from full level to silence over the last `ms` milliseconds.
    pub fn fade_out(&self, ms: u64) -> Self {
        let len = ms_to_frames(ms, self.sample_rate).min(self.frames());
        let mut out = self.clone();
        if len == 0 {
            return out;
        }
        let ch = self.channels as usize;
        let start = self.frames() - len;
        for (i, frame) in out.samples.chunks_exact_mut(ch).skip(start).enumerate() {
            let g = (len - 1 - i) as f32 / len as f32;
            frame.iter_mut().for_each(|s| *s *= g);
        }
        out
    }

    /// Sample-additive mix of `other` onto `self`, aligned at frame 0.
    ///
    /// Rates must already match. Channel counts are synced to the larger of
    /// the two; the result keeps `self`'s length and anything of `other`
    /// past that end is dropped.
    pub fn overlay(&self, other: &AudioBuffer) -> Self {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        let channels = self.channels.max(other.channels);
        let mut base = self.with_channels(channels);
        let top = other.with_channels(channels);
        for (s, o) in base.samples.iter_mut().zip(&top.samples) {
            *s += o;
        }
        base
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
