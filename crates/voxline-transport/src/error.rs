//! Protocol errors for the audio transport.

/// Errors that terminate a single transport connection.
///
/// A protocol error is always fatal to the connection it occurred on and
/// never to the gateway process; other calls continue undisturbed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame header carried a type code outside the protocol.
    #[error("unknown frame type 0x{0:02X}")]
    UnknownFrameType(u8),

    /// An identity payload was empty or not valid UTF-8.
    #[error("identity frame payload is not a valid channel id")]
    InvalidIdentityPayload,

    /// A frame other than `identity` arrived before the stream identified
    /// itself.
    #[error("received {0} frame before identity")]
    FrameBeforeIdentity(&'static str),

    /// A second identity frame arrived on an already-identified stream.
    #[error("duplicate identity frame")]
    DuplicateIdentity,

    /// The peer declared a payload length but stopped sending before the
    /// read timeout elapsed.
    #[error("incomplete frame: peer went silent mid-frame")]
    Truncated,

    /// An outbound payload exceeded the 2-byte length field.
    #[error("payload of {0} bytes exceeds frame limit")]
    PayloadTooLarge(usize),

    /// The peer closed the connection mid-frame.
    #[error("connection closed mid-frame")]
    ClosedMidFrame,

    /// Socket-level failure.
    #[error("transport i/o: {0}")]
    Io(#[from] std::io::Error),
}
