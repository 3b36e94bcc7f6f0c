//! Gapless playback scheduling for inbound synthesized speech.
//!
//! [`PlaybackScheduler`] owns the playback clock and the set of buffers that
//! are scheduled but not yet finished.  Each decoded payload is placed at
//! `max(clock, device position)` and the clock advances by the buffer's
//! length, so consecutive payloads play back-to-back with no gap and no
//! overlap.  A barge-in interruption stops every active buffer at once and
//! resets the clock to zero, so the next payload starts fresh at the device's
//! current position.
//!
//! All positions are measured in output frames on a monotonic counter that
//! the device callback advances via [`PlaybackScheduler::render`]; seconds
//! only appear at the diagnostic accessors.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::pcm::{decode_payload, DecodeError};
use super::resample::resample;
use super::DeviceStream;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the audio output.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Playout state
// ---------------------------------------------------------------------------

/// A decoded buffer waiting to play (or mid-play), pinned to an absolute
/// start frame on the device timeline.
struct ActiveBuffer {
    start: u64,
    samples: Vec<f32>,
}

impl ActiveBuffer {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// Everything the scheduler mutates, behind one lock.
///
/// Computing a buffer's start frame and advancing `next_start` happen under
/// the same lock acquisition, so two payloads decoded concurrently can never
/// observe the same clock value.
struct Playout {
    /// Frames the output device has rendered so far (the device clock).
    device_frames: u64,
    /// The playback clock: frame at which the next buffer should begin.
    next_start: u64,
    /// Scheduled-but-unfinished buffers.
    active: Vec<ActiveBuffer>,
}

// ---------------------------------------------------------------------------
// PlaybackScheduler
// ---------------------------------------------------------------------------

/// Shared handle to the playout state.  Cheap to clone; the session loop
/// schedules and interrupts while the device callback renders.
#[derive(Clone)]
pub struct PlaybackScheduler {
    shared: Arc<Mutex<Playout>>,
    sample_rate: u32,
    max_active: usize,
}

impl PlaybackScheduler {
    /// Create a scheduler for mono output at `sample_rate` Hz, holding at
    /// most `max_active` unfinished buffers.
    pub fn new(sample_rate: u32, max_active: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Playout {
                device_frames: 0,
                next_start: 0,
                active: Vec::new(),
            })),
            sample_rate,
            max_active,
        }
    }

    /// Sample rate of the scheduled audio in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode a base64 PCM payload and schedule it for playback.
    ///
    /// A malformed payload fails only itself: the error is returned, nothing
    /// is scheduled, and the clock and active set are untouched.
    pub fn enqueue_payload(&self, payload: &str) -> Result<(), DecodeError> {
        let samples = decode_payload(payload)?;
        if !samples.is_empty() {
            self.schedule(samples);
        }
        Ok(())
    }

    /// Schedule a decoded buffer at `max(clock, device position)` and advance
    /// the clock by its length.
    ///
    /// When the active set is already at capacity the buffer is dropped with
    /// a warning instead of growing the queue without bound.
    pub fn schedule(&self, samples: Vec<f32>) {
        let mut state = self.shared.lock().unwrap();

        if state.active.len() >= self.max_active {
            log::warn!(
                "playback queue full ({} buffers); dropping {}-sample payload",
                state.active.len(),
                samples.len()
            );
            return;
        }

        let start = state.next_start.max(state.device_frames);
        state.next_start = start + samples.len() as u64;
        state.active.push(ActiveBuffer { start, samples });
    }

    /// Stop every active buffer immediately and reset the clock to zero.
    ///
    /// The next payload scheduled afterwards starts at the device's current
    /// position rather than the abandoned schedule.
    pub fn interrupt(&self) {
        let mut state = self.shared.lock().unwrap();
        let flushed = state.active.len();
        state.active.clear();
        state.next_start = 0;
        if flushed > 0 {
            log::debug!("flushed {flushed} playback buffer(s)");
        }
    }

    /// Number of scheduled-but-unfinished buffers.
    pub fn active_buffers(&self) -> usize {
        self.shared.lock().unwrap().active.len()
    }

    /// The playback clock in seconds: where the schedule currently ends.
    pub fn clock_secs(&self) -> f64 {
        let state = self.shared.lock().unwrap();
        state.next_start as f64 / self.sample_rate as f64
    }

    /// The device position in seconds: how much audio has been rendered.
    pub fn device_secs(&self) -> f64 {
        let state = self.shared.lock().unwrap();
        state.device_frames as f64 / self.sample_rate as f64
    }

    /// Start frame of the most recently scheduled buffer, if any.
    pub fn last_start_frame(&self) -> Option<u64> {
        let state = self.shared.lock().unwrap();
        state.active.last().map(|b| b.start)
    }

    /// Render the next `out.len()` mono frames into `out` and advance the
    /// device clock.
    ///
    /// Called from the output device callback.  Buffers whose samples are
    /// exhausted by this render pass are removed from the active set — the
    /// natural-completion path.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);

        let mut state = self.shared.lock().unwrap();
        let window_start = state.device_frames;
        let window_end = window_start + out.len() as u64;

        for buffer in &state.active {
            if buffer.start >= window_end || buffer.end() <= window_start {
                continue;
            }
            let from = buffer.start.max(window_start);
            let to = buffer.end().min(window_end);
            for pos in from..to {
                let src = (pos - buffer.start) as usize;
                let dst = (pos - window_start) as usize;
                out[dst] += buffer.samples[src];
            }
        }

        state.device_frames = window_end;
        state.active.retain(|b| b.end() > window_end);
    }
}

// ---------------------------------------------------------------------------
// Output stream
// ---------------------------------------------------------------------------

/// Open the output device and start rendering the scheduler's queue.
///
/// The device runs at its preferred configuration.  When its rate differs
/// from the scheduler's, the callback renders the exact source window
/// (tracking the fractional remainder so there is no cumulative drift) and
/// linearly resamples it; the mono signal is duplicated across all device
/// channels.
pub fn start_output(
    scheduler: PlaybackScheduler,
    preferred: Option<&str>,
) -> Result<DeviceStream, PlaybackError> {
    let host = cpal::default_host();

    let device = match preferred {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| PlaybackError::DeviceNotFound(name.to_string()))?,
        None => host.default_output_device().ok_or(PlaybackError::NoDevice)?,
    };

    let supported = device.default_output_config()?;
    let channels = supported.channels() as usize;
    let device_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let source_rate = scheduler.sample_rate();
    let mut carry = 0.0f64;

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels;

            let mono = if device_rate == source_rate {
                let mut mono = vec![0.0f32; frames];
                scheduler.render(&mut mono);
                mono
            } else {
                // Exact number of source frames covering this window, with
                // the fractional remainder carried to the next callback.
                let exact = frames as f64 * source_rate as f64 / device_rate as f64 + carry;
                let src_frames = exact.floor() as usize;
                carry = exact - src_frames as f64;

                let mut src = vec![0.0f32; src_frames];
                scheduler.render(&mut src);
                resample(&src, source_rate, device_rate)
            };

            for (i, frame) in data.chunks_mut(channels).enumerate() {
                let sample = mono.get(i).copied().unwrap_or(0.0);
                for slot in frame {
                    *slot = sample;
                }
            }
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    )?;

    stream.play()?;
    log::info!("audio output started ({device_rate} Hz, {channels} ch)");
    Ok(DeviceStream::new(stream))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
