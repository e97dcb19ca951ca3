//! Per-connection framed read/write halves.

use crate::error::ProtocolError;
use crate::frame::{Frame, FrameCodec};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Initial capacity of the per-connection decode buffer. Audio frames for
/// 16 kHz PCM16 arrive in small chunks; 8 KiB avoids reallocation in the
/// common case.
const READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Tuning knobs shared by every accepted connection.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// How long a partially received frame may sit in the buffer before
    /// the connection is treated as violating the protocol.
    pub frame_timeout: Duration,
    /// Outbound queue depth, in frames.
    pub outbound_capacity: usize,
    /// How long a send may wait for queue capacity before the frame is
    /// dropped.
    pub write_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            frame_timeout: Duration::from_secs(5),
            outbound_capacity: 64,
            write_timeout: Duration::from_millis(200),
        }
    }
}

/// An accepted transport connection, not yet split into halves.
#[derive(Debug)]
pub struct FramedConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl FramedConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    /// The remote (switch-side) address, for logging.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Splits the connection into an owned reader and writer.
    ///
    /// The writer spawns a dedicated task that owns the socket's write
    /// half; the returned [`FrameWriter`] is a cheap handle to its queue.
    pub fn split(self, settings: &TransportSettings) -> (FrameReader, FrameWriter) {
        let (read, write) = self.stream.into_split();
        let reader = FrameReader::new(read, settings.frame_timeout);
        let writer = FrameWriter::spawn(write, settings.outbound_capacity, settings.write_timeout);
        (reader, writer)
    }
}

/// Reads frames from one connection, enforcing the identity-first rule.
///
/// The reader owns its decode buffer; nothing is shared with any other
/// connection.
#[derive(Debug)]
pub struct FrameReader {
    read: OwnedReadHalf,
    buf: BytesMut,
    frame_timeout: Duration,
    identified: bool,
}

impl FrameReader {
    fn new(read: OwnedReadHalf, frame_timeout: Duration) -> Self {
        Self {
            read,
            buf: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            frame_timeout,
            identified: false,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream between frames. Errors
    /// on: any frame before `identity`, a second `identity`, an unknown
    /// type code, a peer that goes silent or disconnects mid-frame.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            if let Some(frame) = FrameCodec::decode(&mut self.buf)? {
                match (&frame, self.identified) {
                    (Frame::Identity(_), false) => self.identified = true,
                    (Frame::Identity(_), true) => return Err(ProtocolError::DuplicateIdentity),
                    (other, false) => {
                        return Err(ProtocolError::FrameBeforeIdentity(other.label()))
                    }
                    (_, true) => {}
                }
                return Ok(Some(frame));
            }

            let n = if self.buf.is_empty() {
                // Between frames: wait as long as the call lasts.
                self.read.read_buf(&mut self.buf).await?
            } else {
                // Mid-frame: the declared length must arrive within the
                // frame timeout or the stream is broken.
                match tokio::time::timeout(self.frame_timeout, self.read.read_buf(&mut self.buf))
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => return Err(ProtocolError::Truncated),
                }
            };

            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::ClosedMidFrame);
            }
        }
    }

    /// Reads the stream-opening identity frame and returns the channel id.
    ///
    /// Any other first frame is a protocol violation; end of stream before
    /// identity is reported as an I/O error.
    pub async fn await_identity(&mut self) -> Result<String, ProtocolError> {
        match self.read_frame().await? {
            Some(Frame::Identity(channel)) => Ok(channel),
            // read_frame already rejects non-identity first frames.
            Some(_) => Err(ProtocolError::FrameBeforeIdentity("unexpected")),
            None => Err(ProtocolError::Io(std::io::ErrorKind::UnexpectedEof.into())),
        }
    }
}

/// Handle to a connection's outbound frame queue.
///
/// The queue is bounded. A send waits up to the configured write timeout
/// for capacity; when the peer is not draining its socket the frame is
/// dropped and logged rather than accumulating. Frames that are accepted
/// are written strictly in the order they were queued.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    tx: mpsc::Sender<Frame>,
    write_timeout: Duration,
}

impl FrameWriter {
    fn spawn(write: OwnedWriteHalf, capacity: usize, write_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(write_loop(write, rx));
        Self { tx, write_timeout }
    }

    /// Queues a frame for writing.
    ///
    /// Returns `Ok(true)` when queued, `Ok(false)` when dropped because the
    /// queue stayed full past the write timeout, and an error when the
    /// connection is gone.
    pub async fn send(&self, frame: Frame) -> Result<bool, ProtocolError> {
        match self.tx.send_timeout(frame, self.write_timeout).await {
            Ok(()) => Ok(true),
            Err(mpsc::error::SendTimeoutError::Timeout(frame)) => {
                tracing::warn!(frame = frame.label(), "outbound queue full, dropping frame");
                Ok(false)
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                Err(ProtocolError::Io(std::io::ErrorKind::BrokenPipe.into()))
            }
        }
    }
}

/// Writer task: drains the queue onto the socket until the handle is
/// dropped or the socket fails.
async fn write_loop(mut write: OwnedWriteHalf, mut rx: mpsc::Receiver<Frame>) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_CAPACITY);
    while let Some(frame) = rx.recv().await {
        buf.clear();
        if let Err(err) = FrameCodec::encode(&frame, &mut buf) {
            tracing::warn!(error = %err, "dropping unencodable outbound frame");
            continue;
        }
        if let Err(err) = write.write_all(&buf).await {
            tracing::debug!(error = %err, "outbound write failed, closing writer");
            break;
        }
    }
    let _ = write.shutdown().await;
}
