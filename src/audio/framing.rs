//! # Browser Audio Framing
//!
//! Agent speech arrives from upstream as bare PCM16 chunks. The browser
//! plays each chunk through standard media APIs, which want a container, so
//! every outbound chunk is wrapped in a minimal mono WAV header before it is
//! sent down the WebSocket.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian};

/// Wrap a mono PCM16 chunk in a WAV container at the given sample rate.
///
/// Odd trailing bytes cannot form a 16-bit sample and are dropped.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let usable = pcm.len() - (pcm.len() % 2);
    let mut samples = vec![0i16; usable / 2];
    LittleEndian::read_i16_into(&pcm[..usable], &mut samples);

    let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, sample_rate, 16);
    let mut out = Cursor::new(Vec::new());
    // Writing to an in-memory cursor cannot fail
    wav::write(header, &wav::BitDepth::Sixteen(samples), &mut out)
        .unwrap_or_else(|e| unreachable!("in-memory WAV write failed: {}", e));
    out.into_inner()
}
