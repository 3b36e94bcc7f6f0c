//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s over a bounded
//! tokio mpsc channel; the device callback uses `try_send` so it can never
//! block on a slow consumer.  The returned [`DeviceStream`] is a RAII guard —
//! dropping it stops the underlying cpal stream.
//!
//! [`BlockAssembler`] turns the irregularly sized device buffers (after
//! downmix and resampling) into the fixed-size blocks the encoder sends.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;

use super::DeviceStream;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]` at the device's
/// native rate.  The session loop downmixes and resamples before encoding.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
///
/// Device acquisition failures (no device, permission refused by the
/// platform) surface here before the session ever reports `Connecting`.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open an input device by name, or the system default when `preferred`
    /// is `None`.
    ///
    /// Queries the device's preferred stream configuration so no manual
    /// rate/channel configuration is required; the session loop adapts the
    /// delivered audio to the wire format instead.
    pub fn new(preferred: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = match preferred {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
        };

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread.  Chunks are
    /// forwarded with `try_send`: when the session loop falls behind and the
    /// channel fills up, the block is dropped rather than stalling the
    /// device callback.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<DeviceStream, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                if tx.try_send(chunk).is_err() {
                    // Receiver gone or channel full; either way the audio
                    // thread must not block.
                    log::trace!("capture chunk dropped");
                }
            },
            |err: cpal::StreamError| {
                log::error!("cpal input stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!(
            "audio capture started ({} Hz, {} ch)",
            self.sample_rate,
            self.channels
        );
        Ok(DeviceStream::new(stream))
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// BlockAssembler
// ---------------------------------------------------------------------------

/// Accumulates resampled mono samples and yields fixed-size capture blocks.
///
/// The device hands the callback whatever buffer size it likes; the wire
/// protocol sends uniform blocks.  A partial tail block stays buffered until
/// more samples arrive and is simply discarded on teardown.
pub struct BlockAssembler {
    pending: Vec<f32>,
    block_samples: usize,
}

impl BlockAssembler {
    /// Create an assembler producing blocks of `block_samples` samples.
    ///
    /// # Panics
    ///
    /// Panics if `block_samples == 0`.
    pub fn new(block_samples: usize) -> Self {
        assert!(block_samples > 0, "block size must be > 0");
        Self {
            pending: Vec::with_capacity(block_samples * 2),
            block_samples,
        }
    }

    /// Append samples to the pending buffer.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    /// Remove and return the next complete block, if one is available.
    pub fn pop_block(&mut self) -> Option<Vec<f32>> {
        if self.pending.len() < self.block_samples {
            return None;
        }
        Some(self.pending.drain(..self.block_samples).collect())
    }

    /// Number of samples waiting for the next block boundary.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn assembler_yields_nothing_below_block_size() {
        let mut asm = BlockAssembler::new(4);
        asm.push_samples(&[0.1, 0.2, 0.3]);
        assert!(asm.pop_block().is_none());
        assert_eq!(asm.pending_len(), 3);
    }

    #[test]
    fn assembler_yields_full_blocks_in_order() {
        let mut asm = BlockAssembler::new(2);
        asm.push_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(asm.pop_block(), Some(vec![1.0, 2.0]));
        assert_eq!(asm.pop_block(), Some(vec![3.0, 4.0]));
        assert!(asm.pop_block().is_none());
        assert_eq!(asm.pending_len(), 1);
    }

    #[test]
    fn assembler_carries_tail_across_pushes() {
        let mut asm = BlockAssembler::new(4);
        asm.push_samples(&[1.0, 2.0, 3.0]);
        assert!(asm.pop_block().is_none());

        asm.push_samples(&[4.0, 5.0]);
        assert_eq!(asm.pop_block(), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(asm.pending_len(), 1);
    }

    #[test]
    fn assembler_exact_boundary_leaves_nothing_pending() {
        let mut asm = BlockAssembler::new(3);
        asm.push_samples(&[1.0, 2.0, 3.0]);
        assert!(asm.pop_block().is_some());
        assert_eq!(asm.pending_len(), 0);
    }
}
