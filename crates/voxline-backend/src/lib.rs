//! Resilient client for the commerce backend.
//!
//! All outbound order traffic goes through this crate, which layers three
//! safety mechanisms over plain HTTP:
//!
//! - **Idempotency keys** for money-moving operations (create, confirm):
//!   one key per logical user intent, reused across retries, so a retried
//!   request can never create a duplicate order.
//! - **Circuit breaker** per endpoint class: after a run of consecutive
//!   transient failures the class short-circuits without network I/O until
//!   a cooldown elapses, then a single half-open trial decides whether to
//!   close again.
//! - **Bounded retry** with doubling backoff, applied only to transient
//!   failures (connect errors, timeouts, 5xx). Validation rejections (4xx)
//!   surface immediately and are never retried.

mod breaker;
mod client;
mod error;
mod idempotency;
mod types;

pub use breaker::{BreakerSettings, CircuitBreaker, EndpointClass};
pub use client::{BackendSettings, CommerceClient, RetrySettings};
pub use error::BackendError;
pub use idempotency::IdempotencyKey;
pub use types::{DeliveryQuote, PickupPoint};
