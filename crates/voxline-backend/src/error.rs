//! Error surface of the commerce backend client.

/// Errors surfaced to the tool router after the resilience layers have
/// done their work.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The circuit is open or retries were exhausted. The agent should
    /// apologize and offer a human-operator transfer; never fabricate a
    /// success.
    #[error("commerce backend unavailable: {reason}")]
    Unavailable { reason: String },

    /// The backend rejected the request (4xx). Never retried.
    #[error("commerce backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered but the body could not be decoded.
    #[error("commerce backend response malformed: {0}")]
    Malformed(#[source] reqwest::Error),
}

impl BackendError {
    /// True when the failure means "try later", as opposed to a request
    /// the backend understood and refused.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
