//! Client for the telephony switch's control API.
//!
//! Two narrow operations cross this boundary: resolving a channel's caller
//! number for the identity step, and handing a call to a human-operator
//! queue for the transfer bridge. Both are HTTP+JSON with Basic auth and a
//! bounded per-request timeout, so a slow or unreachable switch can delay
//! one call's setup but never block the gateway.

mod client;
mod error;

pub use client::{Resolved, SwitchClient, SwitchConfig};
pub use error::SwitchError;
