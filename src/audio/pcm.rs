//! PCM wire codec — float samples to and from base64 16-bit PCM chunks.
//!
//! The coaching endpoint consumes 16 kHz mono PCM and produces 24 kHz mono
//! PCM, both as little-endian `i16` bytes wrapped in base64.  [`encode_chunk`]
//! packages one capture block for transmission; [`decode_payload`] unpacks an
//! inbound synthesized-speech payload for the playback scheduler.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

/// Sample rate of outbound microphone audio in Hz.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of inbound synthesized speech in Hz.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// MIME descriptor attached to every outbound chunk.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

// ---------------------------------------------------------------------------
// MediaChunk
// ---------------------------------------------------------------------------

/// One wire-ready unit of outbound audio: base64 PCM plus its MIME tag.
///
/// Serializes with camelCase field names to match the endpoint's JSON
/// protocol (`{"data": "...", "mimeType": "audio/pcm;rate=16000"}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    /// Base64-encoded little-endian `i16` samples.
    pub data: String,
    /// Content descriptor, always [`CAPTURE_MIME_TYPE`] for capture chunks.
    pub mime_type: String,
}

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Failure to decode a single inbound audio payload.
///
/// Decode errors are localized to one payload: the caller drops the payload
/// and the session continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// 16-bit PCM requires an even number of bytes.
    #[error("PCM payload has odd byte length {0}")]
    OddLength(usize),
}

// ---------------------------------------------------------------------------
// encode / decode
// ---------------------------------------------------------------------------

/// Encode one block of `f32` samples in `[-1.0, 1.0]` as a wire chunk.
///
/// Samples are scaled by 32768 and clamped into the `i16` range, so a sample
/// at exactly `1.0` becomes `32767` instead of wrapping around to negative
/// full scale.
pub fn encode_chunk(samples: &[f32]) -> MediaChunk {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    MediaChunk {
        data: BASE64.encode(&bytes),
        mime_type: CAPTURE_MIME_TYPE.into(),
    }
}

/// Decode a base64 PCM payload back into `f32` samples in `[-1.0, 1.0]`.
///
/// # Errors
///
/// [`DecodeError::Base64`] when the text is not valid base64, and
/// [`DecodeError::OddLength`] when the decoded byte count is not a whole
/// number of 16-bit samples.
pub fn decode_payload(data: &str) -> Result<Vec<f32>, DecodeError> {
    let bytes = BASE64.decode(data)?;
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Maximum quantization error of one 16-bit round trip.
    const EPSILON: f32 = 1.0 / 32768.0;

    #[test]
    fn round_trip_is_within_one_quantization_step() {
        // A sweep across the full valid range, including both endpoints.
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 500.0 - 1.0).collect();

        let chunk = encode_chunk(&samples);
        let decoded = decode_payload(&chunk.data).expect("decode");

        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= EPSILON, "sample {a} decoded as {b}");
        }
    }

    #[test]
    fn full_scale_positive_clamps_instead_of_wrapping() {
        let chunk = encode_chunk(&[1.0]);
        let decoded = decode_payload(&chunk.data).expect("decode");
        // 1.0 * 32768 would overflow i16; it must clamp to 32767, not wrap
        // to a negative value.
        assert!(decoded[0] > 0.999);
        assert!(decoded[0] <= 1.0);
    }

    #[test]
    fn full_scale_negative_is_exact() {
        let chunk = encode_chunk(&[-1.0]);
        let decoded = decode_payload(&chunk.data).expect("decode");
        assert_eq!(decoded[0], -1.0);
    }

    #[test]
    fn over_range_input_clamps() {
        let chunk = encode_chunk(&[2.5, -3.0]);
        let decoded = decode_payload(&chunk.data).expect("decode");
        assert!(decoded[0] > 0.999);
        assert_eq!(decoded[1], -1.0);
    }

    #[test]
    fn known_sample_encodes_little_endian() {
        // 0.5 * 32768 = 16384 = 0x4000 → bytes [0x00, 0x40].
        let chunk = encode_chunk(&[0.5]);
        let bytes = BASE64.decode(&chunk.data).expect("valid base64");
        assert_eq!(bytes, vec![0x00, 0x40]);
    }

    #[test]
    fn chunk_carries_capture_mime_type() {
        let chunk = encode_chunk(&[0.0; 4]);
        assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
    }

    #[test]
    fn chunk_byte_length_is_always_even() {
        for n in [0usize, 1, 7, 4096] {
            let chunk = encode_chunk(&vec![0.25; n]);
            let bytes = BASE64.decode(&chunk.data).expect("valid base64");
            assert_eq!(bytes.len(), n * 2);
        }
    }

    #[test]
    fn decode_rejects_odd_byte_length() {
        let payload = BASE64.encode([0u8, 1, 2]);
        match decode_payload(&payload) {
            Err(DecodeError::OddLength(3)) => {}
            other => panic!("expected OddLength(3), got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(matches!(
            decode_payload("not@valid@base64!"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn decode_empty_payload_is_empty() {
        let decoded = decode_payload("").expect("decode");
        assert!(decoded.is_empty());
    }

    #[test]
    fn media_chunk_serializes_with_camel_case_keys() {
        let chunk = encode_chunk(&[0.0]);
        let value = serde_json::to_value(&chunk).expect("serialize");
        assert!(value.get("mimeType").is_some());
        assert!(value.get("data").is_some());
    }
}
