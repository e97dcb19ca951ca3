//! Tool router: validates and executes agent tool-call requests.
//!
//! The conversational agent crosses into the core through exactly one
//! door: a structured `{name, arguments}` request that deserializes into
//! the closed [`ToolCall`] enum. The router validates every argument
//! against the tool's rules *before* any backend interaction, enforces the
//! business-safety invariants (phone authorization, confirm-only-known
//! orders), and executes exactly one backend operation — or the transfer
//! bridge — per accepted call. The agent gets back a structured
//! [`ToolReply`], never a raw error.

mod call;
mod error;
mod router;

pub use call::{ToolCall, ToolOutput, ToolReply, ToolReplyError};
pub use error::ToolError;
pub use router::{SessionToolContext, ToolRouter};
