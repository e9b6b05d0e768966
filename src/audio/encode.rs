//! Export: 16-bit PCM WAV (hound) and 192 kbit/s MP3 (LAME).

use std::{io::Cursor, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, MonoPcm, Quality};

use super::AudioBuffer;

/// Fixed MP3 bitrate.
pub const MP3_BITRATE: Bitrate = Bitrate::Kbps192;

/// LAME needs at most this much room to flush its internal buffers.
const MP3_FLUSH_RESERVE: usize = 7_200;

/// Convert f32 [-1.0, 1.0] → i16 [-32768, 32767], clipping out-of-range peaks.
fn to_i16(s: f32) -> i16 {
    (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode `audio` as a 16-bit PCM WAV file in memory.
///
/// 16-bit integer PCM rather than IEEE float: every telephone system and
/// media player the announcement might be loaded into accepts it.
pub fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)
            .context("Cannot create WAV writer")?;
        for &s in &audio.samples {
            writer.write_sample(to_i16(s)).context("WAV write error")?;
        }
        writer.finalize().context("WAV finalise error")?;
    }
    Ok(bytes)
}

/// Encode `audio` as a constant-bitrate MP3 at [`MP3_BITRATE`].
///
/// Mono and stereo are supported; anything wider is downmixed to stereo.
pub fn encode_mp3(audio: &AudioBuffer) -> Result<Vec<u8>> {
    let audio = if audio.channels > 2 { audio.with_channels(2) } else { audio.clone() };

    let mut builder = Builder::new().context("Cannot create LAME encoder")?;
    builder
        .set_num_channels(audio.channels as u8)
        .map_err(|e| anyhow!("LAME: cannot set channel count: {:?}", e))?;
    builder
        .set_sample_rate(audio.sample_rate)
        .map_err(|e| anyhow!("LAME: unsupported sample rate {}: {:?}", audio.sample_rate, e))?;
    builder
        .set_brate(MP3_BITRATE)
        .map_err(|e| anyhow!("LAME: cannot set bitrate: {:?}", e))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| anyhow!("LAME: cannot set quality: {:?}", e))?;
    let mut encoder = builder
        .build()
        .map_err(|e| anyhow!("LAME: initialisation failed: {:?}", e))?;

    let planes: Vec<Vec<i16>> = audio
        .deinterleave()
        .into_iter()
        .map(|p| p.into_iter().map(to_i16).collect())
        .collect();
    let frames = audio.frames();

    let mut out = Vec::new();
    out.reserve(mp3lame_encoder::max_required_buffer_size(frames));
    let encoded = match planes.as_slice() {
        [mono] => encoder.encode_to_vec(MonoPcm(mono.as_slice()), &mut out),
        [left, right] => {
            let pcm = DualPcm { left: left.as_slice(), right: right.as_slice() };
            encoder.encode_to_vec(pcm, &mut out)
        }
        _ => bail!("Cannot encode {} channels as MP3", audio.channels),
    };
    encoded.map_err(|e| anyhow!("MP3 encode error: {:?}", e))?;

    out.reserve(MP3_FLUSH_RESERVE);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| anyhow!("MP3 flush error: {:?}", e))?;

    Ok(out)
}

/// Write `bytes` to `path`, creating or truncating it.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(rate: u32, channels: u16, ms: u64) -> AudioBuffer {
        let frames = super::super::ms_to_frames(ms, rate);
        let samples = (0..frames)
            .flat_map(|i| {
                let v = (i as f32 * 0.05).sin() * 0.3;
                std::iter::repeat(v).take(channels as usize)
            })
            .collect();
        AudioBuffer::new(samples, rate, channels)
    }

    #[test]
    fn test_wav_header() {
        let bytes = encode_wav(&tone(44_100, 2, 100)).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.duration(), 4410);
    }

    #[test]
    fn test_wav_clips_out_of_range() {
        let loud = AudioBuffer::new(vec![2.0, -2.0], 8000, 1);
        let bytes = encode_wav(&loud).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let s: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(s, vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_mp3_mono_and_stereo_produce_frames() {
        for channels in [1, 2] {
            let bytes = encode_mp3(&tone(44_100, channels, 500)).unwrap();
            assert!(bytes.len() > 1000, "{} channels → {} bytes", channels, bytes.len());
            // MPEG frame sync: 11 set bits.
            assert!(bytes.windows(2).any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0));
        }
    }

    #[test]
    fn test_mp3_size_matches_bitrate() {
        // 2 s at 192 kbit/s ≈ 48 000 bytes.
        let bytes = encode_mp3(&tone(44_100, 1, 2000)).unwrap();
        assert!((40_000..60_000).contains(&bytes.len()), "{} bytes", bytes.len());
    }
}
