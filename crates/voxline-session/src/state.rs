//! Session lifecycle states.

/// Where a call session is in its life.
///
/// Transitions only move forward except `Transferring → Active` (a failed
/// handoff returns the caller to the agent). Nothing ever leaves
/// `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection accepted, identity frame not yet seen.
    Connecting,
    /// Identity frame received; caller-id lookup in flight.
    Identifying,
    /// Agent conversing; tool calls flow.
    Active,
    /// Queue handoff in flight.
    Transferring,
    /// Hangup or error received; shutting down.
    Closing,
    /// Terminal. Frames received now are ignored.
    Closed,
}

impl SessionState {
    /// Label for logs and audit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Identifying => "identifying",
            Self::Active => "active",
            Self::Transferring => "transferring",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// True once the session can never process anything again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_closed_is_terminal() {
        for state in [
            SessionState::Connecting,
            SessionState::Identifying,
            SessionState::Active,
            SessionState::Transferring,
            SessionState::Closing,
        ] {
            assert!(!state.is_terminal(), "{state}");
        }
        assert!(SessionState::Closed.is_terminal());
    }
}
