//! Audio transport gateway: the framed duplex byte stream between the
//! telephony switch and the call engine.
//!
//! The switch opens one TCP connection per call and speaks a
//! length-prefixed binary protocol: `type(1) | length(2, BE) | payload`.
//! The first frame must be `identity` (the switch channel UUID); after
//! that, `audio` frames carry the caller's voice inbound and synthesized
//! speech outbound, until `hangup` or `error` ends the call.
//!
//! One connection is one call. Each accepted connection gets its own
//! decode buffer and its own writer task, so no audio can ever cross
//! between sessions. Outbound audio goes through a bounded queue with a
//! send timeout: a consumer that stops draining its socket loses frames
//! (logged) instead of growing unbounded backlog.

mod connection;
mod error;
mod frame;
mod gateway;

pub use connection::{FrameReader, FrameWriter, FramedConnection, TransportSettings};
pub use error::ProtocolError;
pub use frame::{Frame, FrameCodec, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
pub use gateway::Gateway;
