// =============================================================================
// Transport layer
// =============================================================================

pub mod factory;
pub mod http;
pub mod rate_limit;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use http::{HttpConfig, HttpTransport};
pub use rate_limit::{NoopRateLimiter, RateLimiter};
pub use ws::{WsSession, WsSessionIo};

/// Unified transport surface the adapter/strategy layers depend on,
/// regardless of whether it is backed by the built-in client or a host
/// framework's transport (see §4.4 / §4.9's host-transport delegation).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn http_get(&self, url: &str, params: &[(&str, String)]) -> Result<bytes::Bytes>;

    async fn ws_connect(&self, url: &str, connect_timeout: Duration) -> Result<WsSession>;

    /// Release pooled sockets / host resources. Idempotent.
    fn close(&self);
}

pub struct BuiltinTransport {
    http: HttpTransport,
}

impl BuiltinTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            http: HttpTransport::new(config),
        }
    }
}

#[async_trait]
impl Transport for BuiltinTransport {
    async fn http_get(&self, url: &str, params: &[(&str, String)]) -> Result<bytes::Bytes> {
        self.http.http_get(url, params, None).await
    }

    async fn ws_connect(&self, url: &str, connect_timeout: Duration) -> Result<WsSession> {
        WsSession::connect(url, connect_timeout).await
    }

    fn close(&self) {
        self.http.close();
    }
}

/// A host-supplied transport: every HTTP call and WS connect is wrapped by
/// the host's named-bucket rate limiter before delegating to the host's own
/// session factory / HTTP client. The core still issues plain `http_get`/
/// `ws_connect` calls -- only construction differs from the built-in path.
pub struct HostTransport {
    inner: Arc<dyn Transport>,
    limiter: Arc<dyn RateLimiter>,
}

impl HostTransport {
    pub fn new(inner: Arc<dyn Transport>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl Transport for HostTransport {
    async fn http_get(&self, url: &str, params: &[(&str, String)]) -> Result<bytes::Bytes> {
        let _guard = self.limiter.execute("http").await;
        self.inner.http_get(url, params).await
    }

    async fn ws_connect(&self, url: &str, connect_timeout: Duration) -> Result<WsSession> {
        let _guard = self.limiter.execute("ws_connect").await;
        self.inner.ws_connect(url, connect_timeout).await
    }

    fn close(&self) {
        self.inner.close();
    }
}
