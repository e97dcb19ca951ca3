//! Per-call session state machine.
//!
//! A session is one task bound 1:1 to a transport connection. It owns the
//! caller's identity, the set of orders established during the call, and
//! the tool-call lifecycle, and it is the only place the pieces meet:
//! frames from the switch, events from the conversational agent, results
//! from the tool router. Sessions share nothing mutable with each other;
//! the only cross-session state is the circuit breaker inside the backend
//! client.
//!
//! Lifecycle: `Connecting` (waiting for the identity frame) →
//! `Identifying` (bounded caller-id lookup) → `Active` (agent converses,
//! tools flow) → `Transferring` (queue handoff in flight) → `Closing` →
//! `Closed`. A hangup or transport error wins over anything else in
//! flight; a tool result arriving after close is discarded, which the
//! idempotent backend mutations make safe.

mod agent;
mod error;
mod session;
mod state;

pub use agent::{AgentConnector, AgentEvent, AgentLink, CallNotice};
pub use error::SessionError;
pub use session::{run_call, SessionDeps};
pub use state::SessionState;
