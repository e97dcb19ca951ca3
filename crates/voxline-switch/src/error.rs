//! Error types for switch control API calls.

/// Errors from the switch control API.
///
/// None of these are fatal to a call: an identity lookup failure leaves
/// the session unverified (same as a masked caller), and a transfer
/// failure leaves the session active with the agent informed.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// The control API did not answer within the configured timeout, or
    /// the connection failed.
    #[error("switch control api unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The switch does not know the channel (the call may already be gone).
    #[error("switch channel not found: {0}")]
    ChannelNotFound(String),

    /// The control API answered with an unexpected status.
    #[error("switch control api returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("switch control api response malformed: {0}")]
    Malformed(#[source] reqwest::Error),
}
