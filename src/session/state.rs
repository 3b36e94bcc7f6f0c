//! Session state machine and the shared status handle the UI reads.
//!
//! [`SessionState`] tracks one live-coaching session:
//!
//! ```text
//! Idle ──start──▶ Connecting ──endpoint accepts──▶ Live
//! Connecting / Live ──transport error──▶ Failed
//! Live ──user stop / remote close──▶ Idle
//! any state ──stop──▶ Idle
//! ```
//!
//! [`SharedStatus`] is a type alias for `Arc<Mutex<SessionStatus>>` — cheap
//! to clone and safe to share between the controller task and the UI.  Lock
//! it for short critical sections only; never across an `.await`.

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of a live-coaching session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; waiting for the user to connect.
    #[default]
    Idle,

    /// Microphone is open and the websocket handshake is in flight.
    Connecting,

    /// Audio is streaming both ways.
    Live,

    /// The transport failed; the user must explicitly restart.
    Failed,
}

impl SessionState {
    /// Returns `true` while a session is being established or running.
    ///
    /// The UI uses this to pick the disconnect affordance over connect.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Live)
    }

    /// A short human-readable label for the status indicator.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Ready",
            SessionState::Connecting => "Connecting",
            SessionState::Live => "Live",
            SessionState::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus / SharedStatus
// ---------------------------------------------------------------------------

/// Snapshot of the session as seen by the UI: the state plus an optional
/// error message for the `Failed` case.
#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    pub state: SessionState,
    pub error: Option<String>,
}

/// Thread-safe handle to [`SessionStatus`].
pub type SharedStatus = Arc<Mutex<SessionStatus>>;

/// Construct a new [`SharedStatus`] starting at `Idle`.
pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(SessionStatus::default()))
}

/// Move to `state`, clearing any stale error message.
pub fn set_state(status: &SharedStatus, state: SessionState) {
    let mut st = status.lock().unwrap();
    st.state = state;
    st.error = None;
}

/// Move to `Failed` with a message for the UI.
pub fn set_failed(status: &SharedStatus, message: String) {
    log::error!("session failed: {message}");
    let mut st = status.lock().unwrap();
    st.state = SessionState::Failed;
    st.error = Some(message);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- SessionState::is_active ---

    #[test]
    fn idle_is_not_active() {
        assert!(!SessionState::Idle.is_active());
    }

    #[test]
    fn connecting_is_active() {
        assert!(SessionState::Connecting.is_active());
    }

    #[test]
    fn live_is_active() {
        assert!(SessionState::Live.is_active());
    }

    #[test]
    fn failed_is_not_active() {
        assert!(!SessionState::Failed.is_active());
    }

    // ---- SessionState::label ---

    #[test]
    fn labels_are_stable() {
        assert_eq!(SessionState::Idle.label(), "Ready");
        assert_eq!(SessionState::Connecting.label(), "Connecting");
        assert_eq!(SessionState::Live.label(), "Live");
        assert_eq!(SessionState::Failed.label(), "Failed");
    }

    // ---- Default ---

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        let status = SessionStatus::default();
        assert_eq!(status.state, SessionState::Idle);
        assert!(status.error.is_none());
    }

    // ---- SharedStatus ---

    #[test]
    fn shared_status_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedStatus>();
    }

    #[test]
    fn set_state_clears_previous_error() {
        let status = new_shared_status();
        set_failed(&status, "boom".into());
        assert_eq!(status.lock().unwrap().state, SessionState::Failed);

        set_state(&status, SessionState::Idle);
        let st = status.lock().unwrap();
        assert_eq!(st.state, SessionState::Idle);
        assert!(st.error.is_none());
    }

    #[test]
    fn set_failed_records_the_message() {
        let status = new_shared_status();
        set_failed(&status, "connection refused".into());
        let st = status.lock().unwrap();
        assert_eq!(st.state, SessionState::Failed);
        assert_eq!(st.error.as_deref(), Some("connection refused"));
    }
}
