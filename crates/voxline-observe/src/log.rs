//! Broadcast fan-out of audit events to in-process subscribers.

use crate::event::{AuditEvent, AuditRecord};
use tokio::sync::broadcast;

/// Default capacity of the audit broadcast channel.
///
/// Slow subscribers that fall more than this many events behind observe a
/// `Lagged` error and miss events; the call path is never blocked on them.
const DEFAULT_AUDIT_CAPACITY: usize = 1024;

/// Shared handle for emitting and subscribing to audit events.
///
/// Cloning is cheap; all clones feed the same channel. Emission never
/// fails: with no live subscribers the event is dropped after being traced,
/// which keeps the audit path non-fatal to call processing.
#[derive(Debug, Clone)]
pub struct AuditLog {
    tx: broadcast::Sender<AuditRecord>,
}

impl AuditLog {
    /// Creates an audit log with the default subscriber capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Creates an audit log with an explicit subscriber capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emits an event, stamping it with the current time.
    pub fn emit(&self, event: AuditEvent) {
        tracing::debug!(
            domain = %event.domain(),
            event_type = event.event_type(),
            session = %event.session_id(),
            "audit event"
        );
        let record = AuditRecord {
            occurred_at: chrono::Utc::now(),
            event,
        };
        let _ = self.tx.send(record);
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.tx.subscribe()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
