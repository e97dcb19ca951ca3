//! Audit event model and in-process fan-out for the Voxline gateway.
//!
//! Every session lifecycle change and every tool invocation outcome is
//! emitted as a structured [`AuditEvent`]. Storage is an external
//! collaborator: subscribers receive events over a broadcast channel and
//! decide their own persistence format. The core never writes audit
//! records itself.

mod event;
mod log;

pub use event::{AuditDomain, AuditEvent, AuditRecord};
pub use log::AuditLog;
