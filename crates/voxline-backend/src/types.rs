//! Wire types specific to the commerce backend API.

use serde::{Deserialize, Serialize};
use voxline_types::OrderView;

/// Response shape of `GET /orders/search`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub orders: Vec<OrderView>,
}

/// Response of `GET /delivery/calculate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    /// Delivery cost in the backend's minor currency unit.
    pub cost: i64,
}

/// One entry of `GET /pickup-points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPoint {
    pub id: String,
    pub name: String,
    pub address: String,
}
