//! Session-level errors.

use voxline_transport::ProtocolError;

/// Failures that end or prevent a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The agent pipeline could not be attached to this call.
    #[error("agent pipeline unavailable: {0}")]
    AgentUnavailable(String),

    /// The transport connection violated the protocol or failed.
    #[error(transparent)]
    Transport(#[from] ProtocolError),
}
