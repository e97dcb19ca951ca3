//! Audit domains, event payloads, and timestamped records.

use serde::{Deserialize, Serialize};
use voxline_types::SessionId;

/// Audit event domains.
///
/// Each domain groups related event types for filtering by downstream
/// consumers (operational dashboards, the persistence collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditDomain {
    /// Call lifecycle: connect, identity resolution, hangup.
    #[serde(rename = "CALL")]
    Call,
    /// Tool invocations and their outcomes.
    #[serde(rename = "TOOL")]
    Tool,
    /// Human-operator transfers.
    #[serde(rename = "TRANSFER")]
    Transfer,
}

impl AuditDomain {
    /// Returns the canonical string label for this domain.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Tool => "TOOL",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl std::fmt::Display for AuditDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured audit event payloads.
///
/// Phone numbers appear only in their masked form (`***1234`); the full
/// number never leaves the session that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    // ── Call domain ──────────────────────────────────────────────────
    /// A new transport connection identified itself and a session was created.
    CallStarted {
        session_id: SessionId,
        /// The switch channel UUID from the identity frame.
        channel_id: String,
    },

    /// The switch control API resolved the caller's number.
    IdentityResolved {
        session_id: SessionId,
        /// Masked caller number.
        caller: String,
    },

    /// The caller id was masked or absent; the number must be obtained verbally.
    IdentityUnknown { session_id: SessionId },

    /// The control API lookup failed; the session proceeded unverified.
    IdentityLookupFailed {
        session_id: SessionId,
        reason: String,
    },

    /// The caller stated a phone number verbally and it validated.
    PhoneSuppliedVerbally {
        session_id: SessionId,
        /// Masked caller number.
        caller: String,
    },

    /// The session reached its terminal state.
    CallEnded {
        session_id: SessionId,
        /// "hangup", "transferred", or "protocol-error".
        reason: String,
        /// Conversation turns observed during the call.
        turns: u64,
    },

    // ── Tool domain ──────────────────────────────────────────────────
    /// A tool call passed validation and its backend operation succeeded.
    ToolAccepted {
        session_id: SessionId,
        tool: String,
        /// The order the tool acted on, when one was involved.
        order_id: Option<String>,
    },

    /// A tool call was rejected before any backend interaction.
    ToolRejected {
        session_id: SessionId,
        tool: String,
        /// Rejection kind: "validation", "need-phone", "authorization", …
        kind: String,
        reason: String,
    },

    /// A tool call passed validation but the backend was unavailable or errored.
    ToolBackendError {
        session_id: SessionId,
        tool: String,
        reason: String,
    },

    // ── Transfer domain ──────────────────────────────────────────────
    /// A transfer to a human-operator queue was requested.
    TransferRequested {
        session_id: SessionId,
        queue: String,
    },

    /// The queue handoff failed; the session stayed active.
    TransferFailed {
        session_id: SessionId,
        queue: String,
        reason: String,
    },
}

impl AuditEvent {
    /// Returns the canonical event type string for this payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CallStarted { .. } => "CALL_STARTED",
            Self::IdentityResolved { .. } => "IDENTITY_RESOLVED",
            Self::IdentityUnknown { .. } => "IDENTITY_UNKNOWN",
            Self::IdentityLookupFailed { .. } => "IDENTITY_LOOKUP_FAILED",
            Self::PhoneSuppliedVerbally { .. } => "PHONE_SUPPLIED_VERBALLY",
            Self::CallEnded { .. } => "CALL_ENDED",
            Self::ToolAccepted { .. } => "TOOL_ACCEPTED",
            Self::ToolRejected { .. } => "TOOL_REJECTED",
            Self::ToolBackendError { .. } => "TOOL_BACKEND_ERROR",
            Self::TransferRequested { .. } => "TRANSFER_REQUESTED",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
        }
    }

    /// Returns the domain for this payload.
    pub fn domain(&self) -> AuditDomain {
        match self {
            Self::CallStarted { .. }
            | Self::IdentityResolved { .. }
            | Self::IdentityUnknown { .. }
            | Self::IdentityLookupFailed { .. }
            | Self::PhoneSuppliedVerbally { .. }
            | Self::CallEnded { .. } => AuditDomain::Call,
            Self::ToolAccepted { .. }
            | Self::ToolRejected { .. }
            | Self::ToolBackendError { .. } => AuditDomain::Tool,
            Self::TransferRequested { .. } | Self::TransferFailed { .. } => AuditDomain::Transfer,
        }
    }

    /// Returns the session this event is attributable to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::CallStarted { session_id, .. }
            | Self::IdentityResolved { session_id, .. }
            | Self::IdentityUnknown { session_id }
            | Self::IdentityLookupFailed { session_id, .. }
            | Self::PhoneSuppliedVerbally { session_id, .. }
            | Self::CallEnded { session_id, .. }
            | Self::ToolAccepted { session_id, .. }
            | Self::ToolRejected { session_id, .. }
            | Self::ToolBackendError { session_id, .. }
            | Self::TransferRequested { session_id, .. }
            | Self::TransferFailed { session_id, .. } => *session_id,
        }
    }
}

/// A timestamped audit event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the event was emitted (UTC).
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    /// The event payload.
    #[serde(flatten)]
    pub event: AuditEvent,
}
