// =============================================================================
// Mock adapter — deterministic in-process adapter for tests
// =============================================================================
//
// Grounded on `original_source/candles_feed/mocking_resources/adapter/`: a
// programmable adapter that serves canned REST batches and WS frames
// without touching the network, so strategy and store behavior can be
// exercised deterministically (§8's end-to-end scenarios).
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::adapter::{ExchangeAdapter, TimestampUnit};
use crate::candle::Candle;
use crate::error::{FeedError, Result};
use crate::interval::Interval;
use crate::network::{EndpointClass, NetworkConfig};
use crate::pair::TradingPair;
use crate::transport::{Transport, WsSession, WsSessionIo};

/// How often `MockWsSession::next_message` re-checks the frame queue while
/// it's empty -- short enough that tests feeding frames after `start()`
/// observe them within a handful of milliseconds.
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(5);

const EXCHANGE_NAME: &str = "mock";

pub struct MockAdapter {
    #[allow(dead_code)]
    config: NetworkConfig,
    ws_intervals: Mutex<HashSet<String>>,
    rest_queue: Mutex<Vec<Vec<Candle>>>,
    ws_frames: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ws_intervals: Mutex::new(HashSet::new()),
            rest_queue: Mutex::new(Vec::new()),
            ws_frames: Mutex::new(Vec::new()),
        }
    }

    /// Declare that this mock streams `interval` over WebSocket, so the
    /// coordinator's `auto` mode selects streaming for it.
    pub fn with_ws_interval(self, interval: &str) -> Self {
        self.ws_intervals.lock().insert(interval.to_string());
        self
    }

    /// Queue the next REST batch `fetch_rest_candles` will return.
    pub fn push_rest_batch(&self, candles: Vec<Candle>) {
        self.rest_queue.lock().push(candles);
    }

    /// Queue a raw WS frame for the streaming strategy to consume. Frames
    /// pushed here are read by `MockWsSession::next_message` -- the session
    /// a feed built with `MockTransport` receives from `ws_connect` -- so
    /// they flow through the real `parse_ws_message` / gap-detect /
    /// `sanitize_and_merge` path, not a test-only shortcut.
    pub fn push_ws_frame(&self, frame: String) {
        self.ws_frames.lock().push(frame);
    }

    /// Pop the oldest queued WS frame, FIFO. Called by `MockWsSession` as it
    /// drives the streaming strategy; also usable directly in unit tests.
    pub fn pop_ws_frame(&self) -> Option<String> {
        let mut frames = self.ws_frames.lock();
        if frames.is_empty() {
            None
        } else {
            Some(frames.remove(0))
        }
    }
}

#[async_trait]
impl ExchangeAdapter for MockAdapter {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    fn timestamp_unit(&self) -> TimestampUnit {
        TimestampUnit::Seconds
    }

    fn format_pair(&self, pair: &TradingPair) -> String {
        pair.canonical()
    }

    fn supported_intervals(&self) -> HashMap<String, i64> {
        Interval::all().map(|i| (i.as_str().to_string(), i.seconds())).collect()
    }

    fn ws_supported_intervals(&self) -> HashSet<String> {
        self.ws_intervals.lock().clone()
    }

    fn rest_url(&self, _class: EndpointClass) -> Result<String> {
        Ok("mock://candles".to_string())
    }

    fn rest_params(
        &self,
        _pair: &TradingPair,
        _interval: &str,
        _start_time: Option<i64>,
        _limit: Option<u32>,
    ) -> Vec<(String, String)> {
        Vec::new()
    }

    fn parse_rest_response(&self, _bytes: &[u8]) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }

    fn ws_url(&self) -> Result<String> {
        Ok("mock://stream".to_string())
    }

    fn ws_subscribe_payload(&self, _pair: &TradingPair, _interval: &str) -> Result<String> {
        Ok("{}".to_string())
    }

    fn parse_ws_message(&self, frame: &str) -> Result<Option<Vec<Candle>>> {
        if frame.is_empty() {
            return Ok(None);
        }
        let candle: MockCandleWire = serde_json::from_str(frame)
            .map_err(|e| FeedError::ParseError(format!("invalid mock frame: {e}")))?;
        Ok(Some(vec![candle.into_candle()?]))
    }

    async fn fetch_rest_candles(
        &self,
        _pair: &TradingPair,
        _interval: &str,
        _start_time: Option<i64>,
        _limit: Option<u32>,
        _transport: Arc<dyn Transport>,
    ) -> Result<Vec<Candle>> {
        let mut queue = self.rest_queue.lock();
        if queue.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(queue.remove(0))
        }
    }
}

#[derive(serde::Deserialize)]
struct MockCandleWire {
    open_time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl MockCandleWire {
    fn into_candle(self) -> Result<Candle> {
        Candle::new(self.open_time, self.open, self.high, self.low, self.close, self.volume, None, None, None, None)
    }
}

/// A `Transport` whose `ws_connect` hands back a session fed by a
/// `MockAdapter`'s frame queue instead of a real socket, and whose
/// `http_get` is never exercised in practice -- `MockAdapter::fetch_rest_candles`
/// is itself overridden to serve its REST queue directly, bypassing the
/// transport. Construct with the same `Arc<MockAdapter>` registered in the
/// adapter registry and pass it to `FeedBuilder::host_transport` so the
/// streaming strategy's connect/subscribe/read loop runs unmodified against
/// queued frames (covers spec §8 scenario 5 end to end).
pub struct MockTransport {
    adapter: Arc<MockAdapter>,
}

impl MockTransport {
    pub fn new(adapter: Arc<MockAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn http_get(&self, _url: &str, _params: &[(&str, String)]) -> Result<bytes::Bytes> {
        Err(FeedError::transport(
            "MockTransport has no http_get backing; MockAdapter::fetch_rest_candles bypasses the transport",
        ))
    }

    async fn ws_connect(&self, _url: &str, _connect_timeout: Duration) -> Result<WsSession> {
        Ok(WsSession::from_io(Box::new(MockWsSession {
            adapter: self.adapter.clone(),
        })))
    }

    fn close(&self) {}
}

struct MockWsSession {
    adapter: Arc<MockAdapter>,
}

#[async_trait]
impl WsSessionIo for MockWsSession {
    async fn send_text(&mut self, _text: String) -> Result<()> {
        Ok(())
    }

    /// Polls the adapter's frame queue until a frame is available. Never
    /// returns `None` on its own -- the streaming strategy only stops
    /// reading via cancellation, matching a live socket that has no idle
    /// frames to deliver yet.
    async fn next_message(&mut self) -> Option<Result<Message>> {
        loop {
            if let Some(frame) = self.adapter.pop_ws_frame() {
                return Some(Ok(Message::Text(frame)));
            }
            tokio::time::sleep(FRAME_POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) {}
}

pub fn register_exchange() {
    crate::registry::register(
        EXCHANGE_NAME,
        Arc::new(|config| Arc::new(MockAdapter::new(config)) as Arc<dyn ExchangeAdapter>),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ws_message_decodes_mock_wire_shape() {
        let adapter = MockAdapter::new(NetworkConfig::production());
        let frame = serde_json::json!({
            "open_time": 1_700_000_000i64,
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 0.0
        })
        .to_string();
        let candles = adapter.parse_ws_message(&frame).unwrap().unwrap();
        assert_eq!(candles[0].open_time, 1_700_000_000);
    }

    #[test]
    fn push_and_pop_ws_frame_is_fifo() {
        let adapter = MockAdapter::new(NetworkConfig::production());
        adapter.push_ws_frame("a".to_string());
        adapter.push_ws_frame("b".to_string());
        assert_eq!(adapter.pop_ws_frame(), Some("a".to_string()));
        assert_eq!(adapter.pop_ws_frame(), Some("b".to_string()));
        assert_eq!(adapter.pop_ws_frame(), None);
    }
}
