// =============================================================================
// Feed coordinator — public facade, one feed per (exchange, pair, interval)
// =============================================================================
//
// §4.9: resolves the adapter at construction, owns exactly one store and at
// most one running strategy at a time, and exposes the small external
// surface (`start`, `stop`, `fetch`, `snapshot`, `add`, readiness
// accessors). `start` is idempotent -- calling it while already running is
// a no-op, matching the teacher's own `AppState` start-guard pattern.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::adapter::ExchangeAdapter;
use crate::candle::Candle;
use crate::config::BackoffPolicy;
use crate::error::{FeedError, Result};
use crate::interval::Interval;
use crate::network::NetworkConfig;
use crate::pair::TradingPair;
use crate::registry;
use crate::store::CandleStore;
use crate::strategy::{polling, streaming, RunningMode, StartMode, StrategyHandle};
use crate::transport::factory::{resolve_transport, HostTransportBundle};
use crate::transport::{HttpConfig, Transport};

const DEFAULT_CAPACITY: usize = 150;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_FETCH_LIMIT: u32 = 500;

/// Construction parameters for a feed. Mirrors `new_feed`'s language-neutral
/// signature in §6; `FeedBuilder` is the Rust-idiomatic way to supply the
/// optional arguments without an overload set.
pub struct FeedBuilder {
    exchange: String,
    pair: TradingPair,
    interval: Interval,
    capacity: usize,
    network_config: NetworkConfig,
    host_transport: Option<HostTransportBundle>,
    http_config: HttpConfig,
    connect_timeout: Duration,
    shutdown_timeout: Duration,
    backoff: BackoffPolicy,
}

impl FeedBuilder {
    pub fn new(exchange: impl Into<String>, pair: TradingPair, interval: Interval) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            interval,
            capacity: DEFAULT_CAPACITY,
            network_config: NetworkConfig::production(),
            host_transport: None,
            http_config: HttpConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn network_config(mut self, config: NetworkConfig) -> Self {
        self.network_config = config;
        self
    }

    pub fn host_transport(mut self, bundle: HostTransportBundle) -> Self {
        self.host_transport = Some(bundle);
        self
    }

    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.http_config = config;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Reconnect backoff policy for the streaming strategy. Has no effect
    /// on polling-mode feeds.
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Resolve the adapter from the registry, allocate the store, and
    /// construct the transport. Does not start collection.
    pub fn build(self) -> Result<Feed> {
        let adapter = registry::resolve(&self.exchange, self.network_config)?;
        if !adapter.supported_intervals().contains_key(self.interval.as_str()) {
            return Err(FeedError::UnsupportedInterval(self.interval.as_str().to_string()));
        }
        let transport = resolve_transport(self.host_transport, self.http_config);
        Ok(Feed {
            exchange: self.exchange,
            pair: self.pair,
            interval: self.interval,
            adapter,
            transport,
            store: Arc::new(RwLock::new(CandleStore::new(self.capacity, self.interval.seconds()))),
            capacity: self.capacity,
            connect_timeout: self.connect_timeout,
            shutdown_timeout: self.shutdown_timeout,
            backoff: self.backoff,
            running: None,
        })
    }
}

pub struct Feed {
    exchange: String,
    pair: TradingPair,
    interval: Interval,
    adapter: Arc<dyn ExchangeAdapter>,
    transport: Arc<dyn Transport>,
    store: Arc<RwLock<CandleStore>>,
    capacity: usize,
    connect_timeout: Duration,
    shutdown_timeout: Duration,
    backoff: BackoffPolicy,
    running: Option<StrategyHandle>,
}

impl Feed {
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn running_mode(&self) -> Option<RunningMode> {
        self.running.as_ref().map(|h| h.mode)
    }

    /// Every interval this feed's exchange supports over REST, mapped to its
    /// length in seconds. Pass-through onto the underlying adapter for
    /// operator tooling that lists what a venue offers.
    pub fn supported_intervals(&self) -> std::collections::HashMap<String, i64> {
        self.adapter.supported_intervals()
    }

    /// The subset of `supported_intervals` this feed's exchange also streams
    /// over WebSocket.
    pub fn ws_supported_intervals(&self) -> std::collections::HashSet<String> {
        self.adapter.ws_supported_intervals()
    }

    /// Select and start a strategy. Idempotent: a second `start` while
    /// already running is a no-op.
    #[instrument(skip(self), fields(exchange = %self.exchange, pair = %self.pair, interval = %self.interval))]
    pub fn start(&mut self, mode: StartMode) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let streamable = self.adapter.ws_supported_intervals().contains(self.interval.as_str());
        let running_mode = match mode {
            StartMode::Auto if streamable => RunningMode::Streaming,
            StartMode::Auto => RunningMode::Polling,
            StartMode::Streaming if !streamable => {
                return Err(FeedError::NotSupported(format!(
                    "{} does not stream interval {}",
                    self.exchange, self.interval
                )));
            }
            StartMode::Streaming => RunningMode::Streaming,
            StartMode::Polling => RunningMode::Polling,
        };

        let cancel = CancellationToken::new();
        let adapter = self.adapter.clone();
        let pair = self.pair.clone();
        let interval = self.interval.as_str().to_string();
        let interval_secs = self.interval.seconds();
        let capacity = self.capacity;
        let transport = self.transport.clone();
        let store = self.store.clone();
        let cancel_clone = cancel.clone();

        let task = match running_mode {
            RunningMode::Polling => tokio::spawn(async move {
                polling::run(adapter, pair, interval, interval_secs, capacity, transport, store, cancel_clone).await;
            }),
            RunningMode::Streaming => {
                let connect_timeout = self.connect_timeout;
                let backoff = self.backoff.clone();
                tokio::spawn(async move {
                    streaming::run(
                        adapter,
                        pair,
                        interval,
                        interval_secs,
                        capacity,
                        transport,
                        store,
                        connect_timeout,
                        backoff,
                        cancel_clone,
                    )
                    .await;
                })
            }
        };

        info!(?running_mode, "feed started");
        self.running = Some(StrategyHandle::new(running_mode, cancel, task));
        Ok(())
    }

    /// Cancel the running strategy and wait up to the configured shutdown
    /// bound. Idempotent: stopping an already-stopped feed is a no-op.
    #[instrument(skip(self), fields(exchange = %self.exchange, pair = %self.pair, interval = %self.interval))]
    pub async fn stop(&mut self) {
        if let Some(handle) = self.running.take() {
            if !handle.stop(self.shutdown_timeout).await {
                tracing::warn!("strategy did not stop within the shutdown bound");
            }
        }
    }

    /// One-shot REST query; inserts the returned candles into the store via
    /// `merge` and returns the sanitized sequence.
    pub async fn fetch(&self, start_time: Option<i64>, end_time: Option<i64>, limit: Option<u32>) -> Result<Vec<Candle>> {
        let candles = polling::poll_once(
            self.adapter.as_ref(),
            &self.pair,
            self.interval.as_str(),
            self.interval.seconds(),
            start_time,
            end_time,
            Some(limit.unwrap_or(DEFAULT_FETCH_LIMIT)),
            self.transport.clone(),
        )
        .await?;
        let mut guard = self.store.write();
        for c in &candles {
            crate::processor::merge(c.clone(), &mut guard);
        }
        Ok(candles)
    }

    /// A copy of the store, oldest first.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.store.read().snapshot()
    }

    /// Insert a candle directly into the store, bypassing any strategy.
    /// Exists for tests exercising store behavior without a running feed.
    pub fn add(&self, candle: Candle) {
        let mut guard = self.store.write();
        crate::processor::merge(candle, &mut guard);
    }

    pub fn ready(&self) -> bool {
        self.store.read().ready()
    }

    pub fn first_open_time(&self) -> Option<i64> {
        self.store.read().first_open_time()
    }

    pub fn last_open_time(&self) -> Option<i64> {
        self.store.read().last_open_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockAdapter;

    fn register_test_mock(name: &str, ws_interval: Option<&str>) {
        let ws_interval = ws_interval.map(|s| s.to_string());
        registry::register(
            name.to_string(),
            Arc::new(move |config| {
                let mut mock = MockAdapter::new(config);
                if let Some(interval) = &ws_interval {
                    mock = mock.with_ws_interval(interval);
                }
                Arc::new(mock) as Arc<dyn ExchangeAdapter>
            }),
        );
    }

    fn candle(open_time: i64) -> Candle {
        Candle::new(open_time, 1.0, 1.0, 1.0, 1.0, 0.0, None, None, None, None).unwrap()
    }

    #[test]
    fn unknown_exchange_rejected_at_build() {
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let err = FeedBuilder::new("does-not-exist-feed", pair, Interval::parse("1m").unwrap()).build();
        assert!(matches!(err, Err(FeedError::UnknownExchange(_))));
    }

    #[test]
    fn supported_intervals_pass_through_the_adapter() {
        register_test_mock("feed-test-mock-intervals", Some("1m"));
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let feed = FeedBuilder::new("feed-test-mock-intervals", pair, Interval::parse("1m").unwrap())
            .build()
            .unwrap();
        assert!(feed.supported_intervals().contains_key("1m"));
        assert!(feed.ws_supported_intervals().contains("1m"));
        assert!(!feed.ws_supported_intervals().contains("1h"));
    }

    #[test]
    fn add_and_snapshot_round_trip() {
        register_test_mock("feed-test-mock-b", None);
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let feed = FeedBuilder::new("feed-test-mock-b", pair, Interval::parse("1m").unwrap())
            .capacity(5)
            .build()
            .unwrap();
        feed.add(candle(60));
        feed.add(candle(120));
        assert_eq!(feed.snapshot().len(), 2);
        assert_eq!(feed.last_open_time(), Some(120));
    }

    #[tokio::test]
    async fn start_auto_selects_streaming_when_adapter_streams_interval() {
        register_test_mock("feed-test-mock-streaming", Some("1m"));
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let mut feed = FeedBuilder::new("feed-test-mock-streaming", pair, Interval::parse("1m").unwrap())
            .capacity(5)
            .build()
            .unwrap();
        feed.start(StartMode::Auto).unwrap();
        assert_eq!(feed.running_mode(), Some(RunningMode::Streaming));
        feed.stop().await;
    }

    #[tokio::test]
    async fn start_auto_falls_back_to_polling_when_adapter_has_no_ws_intervals() {
        register_test_mock("feed-test-mock-polling", None);
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let mut feed = FeedBuilder::new("feed-test-mock-polling", pair, Interval::parse("1m").unwrap())
            .capacity(5)
            .build()
            .unwrap();
        feed.start(StartMode::Auto).unwrap();
        assert_eq!(feed.running_mode(), Some(RunningMode::Polling));
        feed.stop().await;
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        register_test_mock("feed-test-mock-idempotent", None);
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let mut feed = FeedBuilder::new("feed-test-mock-idempotent", pair, Interval::parse("1m").unwrap())
            .capacity(5)
            .build()
            .unwrap();
        feed.start(StartMode::Polling).unwrap();
        feed.start(StartMode::Polling).unwrap();
        feed.stop().await;
    }

    #[tokio::test]
    async fn streaming_mode_on_non_streaming_adapter_is_not_supported() {
        register_test_mock("feed-test-mock-no-stream", None);
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let mut feed = FeedBuilder::new("feed-test-mock-no-stream", pair, Interval::parse("1m").unwrap())
            .capacity(5)
            .build()
            .unwrap();
        let err = feed.start(StartMode::Streaming).unwrap_err();
        assert!(matches!(err, FeedError::NotSupported(_)));
    }
}
