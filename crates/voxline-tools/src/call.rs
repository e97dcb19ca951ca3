//! The closed set of tools the agent may invoke, and the reply envelope.

use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use voxline_types::{DeliveryChoice, OrderItem, OrderView};

/// A structured tool invocation from the agent turn.
///
/// One variant per tool name; deserialization rejects unknown tools and
/// malformed argument shapes outright, so the router's validation can be
/// exhaustive over a closed set instead of an open-ended name lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    /// Look up orders by the caller's phone and/or an order number.
    GetOrderStatus {
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        order_number: Option<String>,
    },
    /// Create a draft order for the caller. Mutating, idempotent.
    CreateOrderDraft {
        items: Vec<OrderItem>,
        #[serde(default)]
        phone: Option<String>,
    },
    /// Change how a draft order is delivered.
    UpdateOrderDelivery {
        order_id: String,
        delivery: DeliveryChoice,
    },
    /// Finalize a draft order. Mutating, idempotent.
    ConfirmOrder { order_id: String },
    /// Hand the call to a human-operator queue.
    TransferToOperator {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl ToolCall {
    /// The wire name of this tool, for audit and logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetOrderStatus { .. } => "get_order_status",
            Self::CreateOrderDraft { .. } => "create_order_draft",
            Self::UpdateOrderDelivery { .. } => "update_order_delivery",
            Self::ConfirmOrder { .. } => "confirm_order",
            Self::TransferToOperator { .. } => "transfer_to_operator",
        }
    }

    /// True for the transfer tool, which moves the session state machine
    /// rather than touching the commerce backend.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferToOperator { .. })
    }
}

/// Successful result of an executed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Orders matching a lookup.
    Orders(Vec<OrderView>),
    /// The order created or mutated.
    Order(OrderView),
    /// The switch acknowledged the queue handoff.
    Transferred,
}

/// Structured reply delivered back across the agent boundary.
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolReplyError>,
}

/// Agent-facing error shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReplyError {
    /// Stable machine-readable kind (e.g. `need_phone`, `validation`).
    pub kind: String,
    /// Human-oriented detail the agent may paraphrase to the caller.
    pub message: String,
}

impl ToolReply {
    pub fn from_outcome(outcome: Result<ToolOutput, ToolError>) -> Self {
        match outcome {
            Ok(output) => Self {
                result: Some(output.into_json()),
                error: None,
            },
            Err(err) => Self {
                result: None,
                error: Some(ToolReplyError {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }
}

impl ToolOutput {
    fn into_json(self) -> serde_json::Value {
        match self {
            Self::Orders(orders) => serde_json::json!({ "orders": orders }),
            Self::Order(order) => serde_json::json!({ "order": order }),
            Self::Transferred => serde_json::json!({ "transferred": true }),
        }
    }
}
