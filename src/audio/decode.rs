//! Container/codec decoding via symphonia.
//!
//! Handles the formats a user is likely to pick as background music
//! (MP3, WAV, FLAC, OGG/Vorbis, M4A/AAC) and the WAV stream returned by the
//! speech service.

use std::{fs::File, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use super::AudioBuffer;

/// Decode the audio file at `path` into an interleaved `f32` buffer.
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str());
    decode_source(Box::new(file), ext)
        .with_context(|| format!("Cannot decode audio file: {}", path.display()))
}

/// Decode an in-memory encoded file. `ext` is an optional format hint.
pub fn decode_bytes(bytes: Vec<u8>, ext: Option<&str>) -> Result<AudioBuffer> {
    decode_source(Box::new(std::io::Cursor::new(bytes)), ext)
}

fn decode_source(source: Box<dyn MediaSource>, ext: Option<&str>) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Unsupported or unrecognised audio format")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No decodable audio track")?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported codec")?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // End of stream.
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = Some(spec.rate);
                channels = Some(spec.channels.count() as u16);
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                // A single corrupt frame is skipped, as players do.
                warn!("skipping undecodable packet: {}", msg);
            }
            Err(e) => return Err(e).context("Audio decode failed"),
        }
    }

    let sample_rate = sample_rate.context("Stream has no sample rate")?;
    let channels = channels.filter(|&c| c > 0).context("Stream has no channels")?;
    let whole = samples.len() - samples.len() % channels as usize;
    samples.truncate(whole);

    let audio = AudioBuffer::new(samples, sample_rate, channels);
    debug!(
        rate = audio.sample_rate,
        channels = audio.channels,
        ms = audio.duration_ms(),
        "decoded audio"
    );
    Ok(audio)
}
