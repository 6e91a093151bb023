//! # Candidate Audio Transcoding
//!
//! Browsers are inconsistent about what they capture: some ship raw PCM16
//! frames, others wrap each chunk in a WAV container with whatever sample
//! rate and channel count the microphone produced. The upstream realtime
//! API accepts exactly one format, mono 16-bit little-endian PCM at its
//! configured rate, so every inbound chunk is normalized here first.
//!
//! ## Pipeline for WAV input:
//! 1. Decode the container (8/16/24-bit and float sources are widened or
//!    narrowed to 16-bit)
//! 2. Mix all channels down to mono by averaging
//! 3. Linearly resample to the target rate
//!
//! Raw (non-RIFF) input is assumed to already be mono PCM16 at the target
//! rate and is passed through after a sanity check on its length.

use byteorder::{ByteOrder, LittleEndian};
use std::io::Cursor;

/// Normalize one browser audio chunk to mono PCM16 at `target_rate`.
pub fn to_upstream_pcm(input: &[u8], target_rate: u32) -> Result<Vec<u8>, String> {
    if input.starts_with(b"RIFF") {
        decode_wav_chunk(input, target_rate)
    } else if input.len() % 2 != 0 {
        Err("Raw PCM16 payload has an odd number of bytes".to_string())
    } else {
        Ok(input.to_vec())
    }
}

fn decode_wav_chunk(input: &[u8], target_rate: u32) -> Result<Vec<u8>, String> {
    let mut reader = Cursor::new(input);
    let (header, data) = wav::read(&mut reader).map_err(|e| format!("Invalid WAV chunk: {}", e))?;

    let samples: Vec<i16> = match data {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            .map(|s| ((s as i16 - 128) << 8))
            .collect(),
        wav::BitDepth::Sixteen(samples) => samples,
        wav::BitDepth::TwentyFour(samples) => {
            samples.into_iter().map(|s| (s >> 8) as i16).collect()
        }
        wav::BitDepth::ThirtyTwoFloat(samples) => samples
            .into_iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect(),
        wav::BitDepth::Empty => Vec::new(),
    };

    let channels = header.channel_count.max(1) as usize;
    let mono = mixdown(&samples, channels);
    let resampled = resample(&mono, header.sampling_rate, target_rate);

    let mut out = vec![0u8; resampled.len() * 2];
    LittleEndian::write_i16_into(&resampled, &mut out);
    Ok(out)
}

/// Average interleaved channels down to a single channel.
fn mixdown(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|s| *s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear-interpolation resampler. Good enough for speech headed into a
/// transcription model; anything fancier is wasted here.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = pos - idx as f64;
        let a = samples[idx.min(samples.len() - 1)] as f64;
        let b = samples[(idx + 1).min(samples.len() - 1)] as f64;
        out.push((a + (b - a) * frac).round() as i16);
    }
    out
}
