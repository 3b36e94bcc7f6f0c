//! Audio pipeline — capture, PCM wire codec, resampling, playback scheduling.
//!
//! # Capture path
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → downmix_to_mono
//!           → resample (16 kHz) → BlockAssembler → encode_chunk → session
//! ```
//!
//! # Playback path
//!
//! ```text
//! session → decode_payload (24 kHz) → PlaybackScheduler → cpal output callback
//! ```

pub mod capture;
pub mod pcm;
pub mod playback;
pub mod resample;

pub use capture::{AudioCapture, AudioChunk, BlockAssembler, CaptureError};
pub use pcm::{
    decode_payload, encode_chunk, DecodeError, MediaChunk, CAPTURE_MIME_TYPE,
    CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE,
};
pub use playback::{start_output, PlaybackError, PlaybackScheduler};
pub use resample::{downmix_to_mono, resample};

// ---------------------------------------------------------------------------
// DeviceStream
// ---------------------------------------------------------------------------

/// RAII guard that keeps a cpal stream alive; dropping it stops the stream.
///
/// `cpal::Stream` is `!Send` on some platforms because of internal raw
/// pointers.  The session owns its guards inside a tokio task, so the guard
/// asserts `Send`: the stream's callback runs on a thread cpal manages, and
/// after construction the handle is never accessed again — it is only held,
/// then dropped.
pub struct DeviceStream {
    _stream: cpal::Stream,
}

// SAFETY: the wrapped stream is only stored to keep the device running and
// is never used from another thread; dropping it from any thread is safe
// because cpal tears the stream down through its own internal handle.
unsafe impl Send for DeviceStream {}

impl DeviceStream {
    pub fn new(stream: cpal::Stream) -> Self {
        Self { _stream: stream }
    }
}
