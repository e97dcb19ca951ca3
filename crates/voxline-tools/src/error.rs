//! Tool router errors, all recoverable at the agent boundary.

use voxline_backend::BackendError;

/// Why a tool call did not produce a result.
///
/// Every variant maps to a stable `kind` string the agent can branch on.
/// None of these propagate past the router as raw errors; they become
/// structured [`crate::ToolReply`] errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments failed schema or business validation. No backend call
    /// was made.
    #[error("{0}")]
    Validation(String),

    /// The tool needs a caller phone number and the session has none —
    /// the agent must obtain one verbally first.
    #[error("no caller phone established for this session")]
    NeedPhone,

    /// The call tried to act on another caller's orders.
    #[error("target phone does not match this caller")]
    Authorization,

    /// `confirm_order`/`update_order_delivery` named an order this session
    /// has never retrieved or created.
    #[error("order {0} was not established in this session")]
    OrderNotInSession(String),

    /// The queue handoff failed; the session stays active.
    #[error("transfer to operator failed: {0}")]
    TransferFailed(String),

    /// The commerce backend refused or could not serve the request.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ToolError {
    /// Stable machine-readable kind for the agent-facing reply.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NeedPhone => "need_phone",
            Self::Authorization => "authorization",
            Self::OrderNotInSession(_) => "order_not_in_session",
            Self::TransferFailed(_) => "transfer_failed",
            Self::Backend(BackendError::Unavailable { .. }) => "backend_unavailable",
            Self::Backend(_) => "backend_rejected",
        }
    }
}
