// =============================================================================
// Exchange adapter contract
// =============================================================================
//
// A single flat capability trait (§9: "keep the capability surface flat;
// let each adapter opt into helpers") rather than a hierarchy of abstract
// base classes. Defaults on the WS methods behave like the source's
// "no-websocket" mixin -- a REST-only adapter simply never overrides them.
// `fetch_rest_candles` has a default implementation that orchestrates
// `rest_url` + `rest_params` + transport + `parse_rest_response`, matching
// §4.1's description of the async/native path; sync-only adapters (wrapping
// a blocking library) override it with `bridge_sync_fetch`.
// =============================================================================

pub mod testnet;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::candle::Candle;
use crate::error::Result;
use crate::network::EndpointClass;
use crate::pair::TradingPair;
use crate::transport::Transport;

pub use testnet::TestnetUrls;

/// How an adapter's venue encodes timestamps on the wire. The base REST
/// param builder converts the engine's second-precision timestamps using
/// this declaration so each adapter writes `rest_params` without repeating
/// the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Millis,
    Iso8601,
}

impl TimestampUnit {
    pub fn encode(&self, epoch_secs: i64) -> String {
        match self {
            TimestampUnit::Seconds => epoch_secs.to_string(),
            TimestampUnit::Millis => (epoch_secs * 1000).to_string(),
            TimestampUnit::Iso8601 => {
                chrono::DateTime::from_timestamp(epoch_secs, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default()
            }
        }
    }
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// The name this adapter is registered under.
    fn name(&self) -> &str;

    /// How this adapter's venue writes timestamps over REST.
    fn timestamp_unit(&self) -> TimestampUnit {
        TimestampUnit::Millis
    }

    /// Convert a canonical `BASE-QUOTE` pair to the venue's wire format.
    fn format_pair(&self, pair: &TradingPair) -> String;

    /// Intervals this venue offers over REST, canonical string -> seconds.
    fn supported_intervals(&self) -> HashMap<String, i64>;

    /// Subset of `supported_intervals` this venue streams over WebSocket.
    /// Empty for REST-only adapters.
    fn ws_supported_intervals(&self) -> HashSet<String> {
        HashSet::new()
    }

    /// Resolve the REST URL for `class` per this adapter's network config.
    fn rest_url(&self, class: EndpointClass) -> Result<String>;

    /// Shape the REST query for a candles request.
    fn rest_params(
        &self,
        pair: &TradingPair,
        interval: &str,
        start_time: Option<i64>,
        limit: Option<u32>,
    ) -> Vec<(String, String)>;

    /// Parse a REST response body into candles (any order -- the data
    /// processor sorts).
    fn parse_rest_response(&self, bytes: &[u8]) -> Result<Vec<Candle>>;

    /// WebSocket URL for streaming. `NotSupported` for REST-only adapters.
    fn ws_url(&self) -> Result<String> {
        Err(crate::error::FeedError::NotSupported(format!(
            "{} does not support streaming",
            self.name()
        )))
    }

    /// Subscription payload sent immediately after connect.
    fn ws_subscribe_payload(&self, _pair: &TradingPair, _interval: &str) -> Result<String> {
        Err(crate::error::FeedError::NotSupported(format!(
            "{} does not support streaming",
            self.name()
        )))
    }

    /// Parse one WebSocket frame. `Ok(None)` for non-candle frames
    /// (heartbeats, acks, errors) -- these are silently ignored by the
    /// streaming strategy.
    fn parse_ws_message(&self, _frame: &str) -> Result<Option<Vec<Candle>>> {
        Ok(None)
    }

    /// Orchestrate `rest_url` + `rest_params` + transport + parse. The
    /// default implementation is the async/native path; sync-only adapters
    /// override this to bridge a blocking client via `spawn_blocking`.
    async fn fetch_rest_candles(
        &self,
        pair: &TradingPair,
        interval: &str,
        start_time: Option<i64>,
        limit: Option<u32>,
        transport: Arc<dyn Transport>,
    ) -> Result<Vec<Candle>> {
        let url = self.rest_url(EndpointClass::Candles)?;
        let params = self.rest_params(pair, interval, start_time, limit);
        let bytes = transport.http_get(&url, &borrow_params(&params)).await?;
        self.parse_rest_response(&bytes)
    }
}

fn borrow_params(params: &[(String, String)]) -> Vec<(&str, String)> {
    params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
}

/// Helper for sync-only adapters that wrap a blocking library: runs
/// `blocking_fetch` on a worker thread and awaits its completion, so the
/// rest of the engine never blocks its async runtime on a venue SDK call.
pub async fn bridge_sync_fetch<F>(blocking_fetch: F) -> Result<Vec<Candle>>
where
    F: FnOnce() -> Result<Vec<Candle>> + Send + 'static,
{
    match tokio::task::spawn_blocking(blocking_fetch).await {
        Ok(result) => result,
        Err(join_err) => Err(crate::error::FeedError::transport(format!(
            "blocking fetch task panicked: {join_err}"
        ))),
    }
}
