//! Accept loop for inbound switch connections.

use crate::connection::{FrameReader, FrameWriter, FramedConnection, TransportSettings};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Listens for switch connections and hands each one to a handler.
///
/// One accepted connection is one call: the handler receives the framed
/// reader/writer pair and runs as its own task, so a protocol error or
/// panic-free failure in one call never affects another.
#[derive(Debug)]
pub struct Gateway {
    listener: TcpListener,
    settings: TransportSettings,
}

impl Gateway {
    /// Binds the gateway to `addr`.
    pub async fn bind(addr: SocketAddr, settings: TransportSettings) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, settings })
    }

    /// The bound local address (useful when binding port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the listener fails.
    ///
    /// `handler` is invoked once per accepted connection, on its own task.
    pub async fn run<H, Fut>(self, handler: H) -> std::io::Result<()>
    where
        H: Fn(FrameReader, FrameWriter, SocketAddr) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "accepted switch connection");

            let conn = FramedConnection::new(stream, peer);
            let settings = self.settings.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                let (reader, writer) = conn.split(&settings);
                handler(reader, writer, peer).await;
            });
        }
    }
}
