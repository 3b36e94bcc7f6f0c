//! Live AI voice coaching — a native client for a speech-to-speech coaching
//! session.
//!
//! The microphone is captured, downsampled to 16 kHz mono 16-bit PCM and
//! streamed to a remote coaching endpoint over a websocket; synthesized
//! 24 kHz speech streams back and is played gaplessly, with support for
//! server-driven barge-in interruption.
//!
//! # Crate layout
//!
//! * [`audio`]   — capture, PCM wire codec, resampling, playback scheduling.
//! * [`session`] — state machine, wire protocol, transport, orchestrator.
//! * [`config`]  — TOML settings and platform paths.
//! * [`app`]     — the egui window (connect control + status indicator).

pub mod app;
pub mod audio;
pub mod config;
pub mod session;
