//! Session orchestrator — owns one live coaching session end to end.
//!
//! [`LiveSession`] is the explicitly owned session object: microphone stream,
//! output stream, transport and the event-loop task are all created on start
//! and torn down together on stop or failure.  Nothing session-scoped lives
//! in a global.
//!
//! [`run_controller`] is the long-lived task the UI talks to.  It reacts to
//! [`SessionCommand`]s and to the session loop ending on its own (remote
//! close or transport failure), making sure device handles are released on
//! every exit path.
//!
//! # Event flow
//!
//! ```text
//! SessionCommand::Start
//!   └─▶ open microphone → Connecting → websocket handshake → output device
//!       → Live → spawn session loop
//!
//! session loop (select):
//!   capture chunk  → downmix → resample 16 kHz → block → encode → send
//!   ServerEvent::Audio       → decode → schedule playback
//!   ServerEvent::Interrupted → flush playback
//!   ServerEvent::Closed      → flush, status Idle, exit
//!   ServerEvent::Error       → flush, status Failed, exit
//!
//! SessionCommand::Stop
//!   └─▶ abort loop, close transport, flush playback, drop device streams,
//!       status Idle
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{
    downmix_to_mono, encode_chunk, resample, start_output, AudioCapture, AudioChunk,
    BlockAssembler, CaptureError, DeviceStream, PlaybackError, PlaybackScheduler,
    CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE,
};
use crate::config::AppConfig;

use super::state::{set_failed, set_state, SessionState, SharedStatus};
use super::transport::{CoachTransport, LiveTransport, ServerEvent, TransportError};

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// Commands sent from the UI to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start a session; tears down a live one first.
    Start,
    /// Stop the session; safe from any state.
    Stop,
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors that can prevent a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no API key configured (set api_key in settings.toml or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("microphone unavailable: {0}")]
    Capture(#[from] CaptureError),

    #[error("audio output unavailable: {0}")]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// LiveSession
// ---------------------------------------------------------------------------

/// One running session and every resource it owns.
pub struct LiveSession {
    transport: Arc<dyn CoachTransport>,
    scheduler: PlaybackScheduler,
    loop_task: JoinHandle<()>,
    _capture: DeviceStream,
    _output: DeviceStream,
}

impl LiveSession {
    /// Acquire the devices, connect, and go live.
    ///
    /// The microphone is opened first: a permission or device failure
    /// surfaces before the status ever reports `Connecting`.  Any error
    /// releases everything acquired so far (the stream guards drop with the
    /// stack frame).
    pub async fn start(config: &AppConfig, status: &SharedStatus) -> Result<Self, SessionError> {
        let api_key = config.api.resolve_key().ok_or(SessionError::MissingApiKey)?;

        let capture = AudioCapture::new(config.audio.input_device.as_deref())?;
        let (chunk_tx, chunk_rx) = mpsc::channel::<AudioChunk>(64);
        let capture_stream = capture.start(chunk_tx)?;

        set_state(status, SessionState::Connecting);

        let timeout = Duration::from_secs(config.api.connect_timeout_secs);
        let (transport, events_rx) = tokio::time::timeout(
            timeout,
            LiveTransport::connect(&config.api, &config.coach, &api_key),
        )
        .await
        .map_err(|_| TransportError::Connect("connect timed out".into()))??;

        let scheduler =
            PlaybackScheduler::new(PLAYBACK_SAMPLE_RATE, config.audio.max_active_buffers);
        let output_stream = start_output(scheduler.clone(), config.audio.output_device.as_deref())?;

        set_state(status, SessionState::Live);
        log::info!("coach session live");

        let transport: Arc<dyn CoachTransport> = Arc::new(transport);
        let loop_task = tokio::spawn(run_session_loop(
            chunk_rx,
            events_rx,
            Arc::clone(&transport),
            scheduler.clone(),
            Arc::clone(status),
            config.audio.block_samples,
        ));

        Ok(Self {
            transport,
            scheduler,
            loop_task,
            _capture: capture_stream,
            _output: output_stream,
        })
    }

    /// Tear the session down: stop the loop, close the transport, flush
    /// playback, and release both device streams.
    ///
    /// Safe to call whether the loop is still running or already finished;
    /// no capture or playback callback fires once this returns.
    pub async fn shutdown(self) {
        self.loop_task.abort();
        self.transport.close().await;
        self.scheduler.interrupt();
        // Device streams stop when the guards drop here.
    }
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

/// Pump capture blocks out and server events in until either side ends.
///
/// Encoding and sending happen sequentially on this task, so chunks go out
/// in capture order.  Playback scheduling happens in event-arrival order for
/// the same reason.
async fn run_session_loop(
    mut chunk_rx: mpsc::Receiver<AudioChunk>,
    mut events_rx: mpsc::Receiver<ServerEvent>,
    transport: Arc<dyn CoachTransport>,
    scheduler: PlaybackScheduler,
    status: SharedStatus,
    block_samples: usize,
) {
    let mut assembler = BlockAssembler::new(block_samples);

    loop {
        tokio::select! {
            chunk = chunk_rx.recv() => match chunk {
                Some(chunk) => {
                    let mono = downmix_to_mono(&chunk.samples, chunk.channels);
                    let resampled = resample(&mono, chunk.sample_rate, CAPTURE_SAMPLE_RATE);
                    assembler.push_samples(&resampled);

                    while let Some(block) = assembler.pop_block() {
                        if let Err(e) = transport.send_chunk(encode_chunk(&block)).await {
                            scheduler.interrupt();
                            set_failed(&status, format!("send failed: {e}"));
                            return;
                        }
                    }
                }
                // Capture side dropped; the controller is tearing down.
                None => return,
            },

            event = events_rx.recv() => match event {
                Some(ServerEvent::Audio(payload)) => {
                    if let Err(e) = scheduler.enqueue_payload(&payload) {
                        log::warn!("dropping malformed audio payload: {e}");
                    }
                }
                Some(ServerEvent::Interrupted) => {
                    log::debug!("barge-in: flushing playback");
                    scheduler.interrupt();
                }
                Some(ServerEvent::Error(message)) => {
                    scheduler.interrupt();
                    set_failed(&status, message);
                    return;
                }
                Some(ServerEvent::Closed) | None => {
                    log::info!("remote closed the session");
                    scheduler.interrupt();
                    set_state(&status, SessionState::Idle);
                    return;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Drive sessions from UI commands until the command channel closes.
///
/// Spawn as a tokio task from `main()`.  Also watches the running session's
/// loop task so that a remote close or transport failure releases the device
/// handles without waiting for the user.
pub async fn run_controller(
    config: AppConfig,
    status: SharedStatus,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let mut session: Option<LiveSession> = None;

    loop {
        let wake = match session.as_mut() {
            Some(live) => tokio::select! {
                cmd = commands.recv() => Wake::Command(cmd),
                _ = &mut live.loop_task => Wake::LoopEnded,
            },
            None => Wake::Command(commands.recv().await),
        };

        match wake {
            Wake::LoopEnded => {
                // The loop already set the terminal status; release devices.
                if let Some(live) = session.take() {
                    live.shutdown().await;
                }
            }

            Wake::Command(Some(SessionCommand::Start)) => {
                if let Some(old) = session.take() {
                    log::info!("tearing down previous session before starting a new one");
                    old.shutdown().await;
                }
                match LiveSession::start(&config, &status).await {
                    Ok(live) => session = Some(live),
                    Err(e) => set_failed(&status, e.to_string()),
                }
            }

            Wake::Command(Some(SessionCommand::Stop)) => {
                if let Some(live) = session.take() {
                    live.shutdown().await;
                }
                set_state(&status, SessionState::Idle);
            }

            Wake::Command(None) => break,
        }
    }

    if let Some(live) = session.take() {
        live.shutdown().await;
    }
    log::info!("session controller shutting down");
}

enum Wake {
    Command(Option<SessionCommand>),
    LoopEnded,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
