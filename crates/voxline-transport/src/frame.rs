//! Wire format for the switch-to-gateway audio stream.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};

/// Frame type code: call termination. Payload is empty.
pub const TYPE_HANGUP: u8 = 0x00;

/// Frame type code: channel identity. Payload is the switch channel UUID
/// as UTF-8, sent exactly once at the start of the stream.
pub const TYPE_IDENTITY: u8 = 0x01;

/// Frame type code: audio. Payload is linear PCM, 16 kHz mono, 16-bit
/// little-endian samples.
pub const TYPE_AUDIO: u8 = 0x10;

/// Frame type code: switch-side error. Payload is diagnostic bytes.
pub const TYPE_ERROR: u8 = 0xFF;

/// Size of the fixed frame header: type byte plus big-endian length.
pub const FRAME_HEADER_LEN: usize = 3;

/// Largest payload the 2-byte length field can declare.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// One decoded frame of the audio transport protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The switch channel UUID identifying this call.
    Identity(String),
    /// PCM16 LE 16 kHz mono samples.
    Audio(Vec<u8>),
    /// The call has ended.
    Hangup,
    /// The switch reported an error; diagnostic payload attached.
    Error(Vec<u8>),
}

impl Frame {
    /// Returns the wire type code for this frame.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Hangup => TYPE_HANGUP,
            Self::Identity(_) => TYPE_IDENTITY,
            Self::Audio(_) => TYPE_AUDIO,
            Self::Error(_) => TYPE_ERROR,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hangup => "hangup",
            Self::Identity(_) => "identity",
            Self::Audio(_) => "audio",
            Self::Error(_) => "error",
        }
    }
}

/// Incremental encoder/decoder for [`Frame`]s over a byte buffer.
///
/// The decoder is stateless between calls: it consumes a complete frame
/// from the front of the buffer or leaves the buffer untouched until more
/// bytes arrive. Each connection owns its own buffer; nothing here is
/// shared across calls.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Attempts to decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete
    /// frame. Unknown type codes and identity payloads that are not valid
    /// UTF-8 are protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let frame_type = buf[0];
        let declared_len = u16::from_be_bytes([buf[1], buf[2]]) as usize;

        if buf.len() < FRAME_HEADER_LEN + declared_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(declared_len);

        let frame = match frame_type {
            TYPE_HANGUP => Frame::Hangup,
            TYPE_IDENTITY => {
                let channel = std::str::from_utf8(&payload)
                    .map_err(|_| ProtocolError::InvalidIdentityPayload)?
                    .trim_end_matches('\0')
                    .to_string();
                if channel.is_empty() {
                    return Err(ProtocolError::InvalidIdentityPayload);
                }
                Frame::Identity(channel)
            }
            TYPE_AUDIO => Frame::Audio(payload.to_vec()),
            TYPE_ERROR => Frame::Error(payload.to_vec()),
            other => return Err(ProtocolError::UnknownFrameType(other)),
        };

        Ok(Some(frame))
    }

    /// Encodes a frame onto the end of `buf`.
    pub fn encode(frame: &Frame, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let payload: &[u8] = match frame {
            Frame::Hangup => &[],
            Frame::Identity(channel) => channel.as_bytes(),
            Frame::Audio(pcm) => pcm,
            Frame::Error(diag) => diag,
        };

        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        buf.reserve(FRAME_HEADER_LEN + payload.len());
        buf.put_u8(frame.type_code());
        buf.put_u16(payload.len() as u16);
        buf.put_slice(payload);
        Ok(())
    }
}
