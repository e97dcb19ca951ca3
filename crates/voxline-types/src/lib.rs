//! Shared domain types for the Voxline gateway.
//!
//! This crate provides the foundational types used across all Voxline
//! crates: caller phone numbers, order and delivery projections, and the
//! session identifier. It depends on no other workspace crate, keeping the
//! dependency graph leaf-first and free of cycles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod phone;

pub use phone::{PhoneNumber, PhoneParseError};

/// Opaque identifier for one call session.
///
/// Assigned by the gateway when a connection arrives; distinct from the
/// switch's channel UUID, which identifies the call on the PBX side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One order line: a product and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Backend product identifier.
    pub product_id: String,
    /// Number of units. Validated by the tool router before any backend call.
    pub quantity: u32,
}

/// How an order should reach the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryChoice {
    /// Courier delivery to a street address.
    Delivery { city: String, address: String },
    /// Customer pickup at a named point.
    Pickup { point_id: String },
}

/// Minimal projection of an order, enough to voice a confirmation.
///
/// The commerce backend is the source of truth; the core holds this view
/// only for the duration of a call and never persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    /// Backend order identifier.
    pub id: String,
    /// Human-facing order number, if the backend assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Item subtotal, in the backend's minor currency unit.
    pub subtotal: i64,
    /// Delivery cost, in the backend's minor currency unit.
    pub delivery_cost: i64,
    /// Grand total, in the backend's minor currency unit.
    pub total: i64,
    /// Backend-owned status string (e.g. "draft", "confirmed").
    pub status: String,
}
