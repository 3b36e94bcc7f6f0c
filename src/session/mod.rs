//! Live coaching session — state machine, wire protocol, transport, and the
//! orchestrator that owns one session's lifecycle.

pub mod coach;
pub mod state;
pub mod transport;
pub mod wire;

pub use coach::{run_controller, LiveSession, SessionCommand, SessionError};
pub use state::{new_shared_status, SessionState, SessionStatus, SharedStatus};
pub use transport::{CoachTransport, LiveTransport, ServerEvent, TransportError};
