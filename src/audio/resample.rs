//! Sample-rate conversion using rubato.
//!
//! Output length is exact: `round(frames × target / source)` frames, with the
//! resampler's start-up delay removed and its tail flushed.

use anyhow::{Context, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};

use super::AudioBuffer;

/// Input frames fed to the resampler per call.
const CHUNK_SIZE: usize = 1024;

fn append(out: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (plane, part) in out.iter_mut().zip(chunk) {
        plane.extend(part);
    }
}

/// Resample `audio` to `target_rate`, keeping its channel layout.
pub fn resample(audio: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if audio.sample_rate == target_rate || audio.is_empty() {
        return Ok(AudioBuffer { sample_rate: target_rate, ..audio.clone() });
    }

    let ratio = f64::from(target_rate) / f64::from(audio.sample_rate);
    let frames = audio.frames();
    let expected = (frames as f64 * ratio).round() as usize;
    let channels = audio.channels as usize;

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Cubic,
        CHUNK_SIZE,
        channels,
    )
    .with_context(|| {
        format!("Failed to create resampler {} Hz → {} Hz", audio.sample_rate, target_rate)
    })?;

    let delay = resampler.output_delay();
    let planes = audio.deinterleave();
    let mut out = vec![Vec::with_capacity(expected + delay); channels];

    // ── Full chunks ──────────────────────────────────────────────────────────
    let mut pos = 0;
    while pos + resampler.input_frames_next() <= frames {
        let n = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planes.iter().map(|p| &p[pos..pos + n]).collect();
        let result = resampler.process(chunk.as_slice(), None).context("Resampling failed")?;
        append(&mut out, result);
        pos += n;
    }

    // ── Remainder ────────────────────────────────────────────────────────────
    if pos < frames {
        let chunk: Vec<&[f32]> = planes.iter().map(|p| &p[pos..]).collect();
        let result = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .context("Resampling failed")?;
        append(&mut out, result);
    }

    // ── Flush the delay line ─────────────────────────────────────────────────
    while out[0].len() < expected + delay {
        let result = resampler
            .process_partial::<&[f32]>(None, None)
            .context("Resampling flush failed")?;
        if result.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut out, result);
    }

    for plane in &mut out {
        plane.drain(..delay.min(plane.len()));
        plane.resize(expected, 0.0);
    }

    Ok(AudioBuffer::interleave(&out, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        AudioBuffer::new(samples, rate, 1)
    }

    #[test]
    fn test_same_rate_is_clone() {
        let b = sine(440.0, 44_100, 1000);
        assert_eq!(resample(&b, 44_100).unwrap(), b);
    }

    #[test]
    fn test_upsample_length_exact() {
        let b = sine(440.0, 24_000, 24_000);
        let r = resample(&b, 44_100).unwrap();
        assert_eq!(r.sample_rate, 44_100);
        assert_eq!(r.frames(), 44_100);
    }

    #[test]
    fn test_downsample_stereo_length_exact() {
        let mono = sine(220.0, 48_000, 12_345);
        let stereo = mono.with_channels(2);
        let r = resample(&stereo, 44_100).unwrap();
        assert_eq!(r.channels, 2);
        assert_eq!(r.frames(), (12_345.0f64 * 44_100.0 / 48_000.0).round() as usize);
    }

    #[test]
    fn test_signal_energy_preserved() {
        let b = sine(440.0, 22_050, 22_050);
        let r = resample(&b, 44_100).unwrap();
        // Peak of a 0.5-amplitude sine stays close to 0.5 after interpolation.
        assert!((r.peak() - 0.5).abs() < 0.05, "peak = {}", r.peak());
    }

    #[test]
    fn test_empty_input() {
        let b = AudioBuffer::new(Vec::new(), 24_000, 1);
        let r = resample(&b, 44_100).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.sample_rate, 44_100);
    }
}
