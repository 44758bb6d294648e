// =============================================================================
// Built-in HTTP transport — pooled reqwest client
// =============================================================================
//
// Grounded on the teacher's `binance::client::BinanceClient` construction:
// a single pooled `reqwest::Client` with a total request timeout, reused
// across calls. Unlike the teacher's signed client, this transport is
// generic -- it does not know about any venue's auth scheme; adapters build
// their own headers/params and hand them to `http_get`.
// =============================================================================

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::{FeedError, Result};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub total_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let total = Duration::from_secs(10);
        Self {
            total_timeout: total,
            connect_timeout: (total / 2).min(Duration::from_secs(5)),
            pool_max_idle_per_host: 8,
        }
    }
}

/// The built-in transport. Thread-safe: `http_get` may be called
/// concurrently from multiple feeds sharing the same instance.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.total_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .expect("failed to build reqwest client");
        debug!("HttpTransport initialised");
        Self { client }
    }

    /// GET `url` with `params`; bubble up HTTP status >= 400 as a
    /// `TransportError` carrying status and body.
    #[instrument(skip(self, params, headers))]
    pub async fn http_get(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: Option<reqwest::header::HeaderMap>,
    ) -> Result<bytes::Bytes> {
        let mut req = self.client.get(url).query(params);
        if let Some(h) = headers {
            req = req.headers(h);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.as_u16() >= 400 {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "http_get received error status");
            return Err(FeedError::transport_status(status.as_u16(), body));
        }
        Ok(resp.bytes().await?)
    }

    /// Release pooled sockets. Safe to call even though `reqwest::Client`
    /// has no explicit close -- dropping the client does this; this method
    /// exists so transport implementations share one lifecycle shape.
    pub fn close(&self) {
        debug!("HttpTransport close (no-op: pool released on drop)");
    }
}
