//! Idempotency keys for mutating backend operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client-generated token that makes a mutating request safe to retry.
///
/// One key is issued per logical user intent — one create-order attempt,
/// one confirmation — at tool-invocation time, and the same key is carried
/// on every retry of that intent. The backend is contracted to return the
/// original result when it sees a key twice. A new intent always gets a
/// new key; a key is never reused for a semantically different mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Issues a fresh key for a new logical intent.
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }

    /// Header value form.
    pub fn as_header_value(&self) -> String {
        self.0.to_string()
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
