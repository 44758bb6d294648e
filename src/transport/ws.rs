// =============================================================================
// Built-in WebSocket transport — session handle
// =============================================================================
//
// Grounded on the teacher's `market_data::candle_buffer::run_kline_stream`
// connect-and-read loop, lifted out of the strategy and into a reusable
// session type: `send`, a finite message iterator, `close`. Frames are
// opaque text/binary payloads -- decoding is the adapter's job.
//
// `WsSession` is a thin handle around a boxed `WsSessionIo`, not the
// tungstenite stream directly, so a `Transport` other than the built-in one
// (a host's own session factory, or a test fake) can hand back a session the
// streaming strategy drives exactly the same way.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::Result;

/// What a WebSocket session must support for the streaming strategy to
/// drive it: send a frame, read the next one, close. Implemented by the
/// built-in tungstenite-backed session and, in tests, by a fake fed from an
/// in-process queue.
#[async_trait]
pub trait WsSessionIo: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// The next frame, or `None` once the stream has closed.
    async fn next_message(&mut self) -> Option<Result<Message>>;

    async fn close(&mut self);
}

pub struct WsSession {
    inner: Box<dyn WsSessionIo>,
}

impl WsSession {
    /// Open a WebSocket session to `url`, bounded by `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let (stream, _response) = tokio::time::timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| crate::error::FeedError::transport("websocket connect timed out"))??;
        debug!(url = %url, "websocket session established");
        Ok(Self {
            inner: Box::new(TungsteniteSession { stream }),
        })
    }

    /// Wrap any `WsSessionIo` implementation as a session -- the seam a
    /// `Transport` other than the built-in one uses to hand back a fake or
    /// host-specific session.
    pub fn from_io(inner: Box<dyn WsSessionIo>) -> Self {
        Self { inner }
    }

    /// Send a text frame (the common case -- JSON subscription payloads).
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner.send_text(text).await
    }

    /// Read the next frame, or `None` once the stream has closed.
    pub async fn next_message(&mut self) -> Option<Result<Message>> {
        self.inner.next_message().await
    }

    pub async fn close(&mut self) {
        self.inner.close().await
    }
}

struct TungsteniteSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WsSessionIo for TungsteniteSession {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<Message>> {
        self.stream.next().await.map(|r| r.map_err(Into::into))
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
