// =============================================================================
// Strategy state machines
// =============================================================================
//
// One `tokio::task` per running strategy (§5), cancelled via a
// `CancellationToken` checked at suspension points. Shared helpers here
// cover what both state machines need: interval alignment, sanitize+merge,
// and the handle the coordinator holds to stop a running task within the
// shutdown bound.
// =============================================================================

pub mod polling;
pub mod streaming;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::adapter::ExchangeAdapter;
use crate::candle::Candle;
use crate::error::Result;
use crate::pair::TradingPair;
use crate::processor;
use crate::store::CandleStore;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Auto,
    Streaming,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningMode {
    Streaming,
    Polling,
}

/// A running strategy task plus the means to cancel and wait on it.
pub struct StrategyHandle {
    pub mode: RunningMode,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl StrategyHandle {
    pub fn new(mode: RunningMode, cancel: CancellationToken, task: tokio::task::JoinHandle<()>) -> Self {
        Self { mode, cancel, task }
    }

    /// Cancel the strategy and wait up to `shutdown_timeout` for it to
    /// finish. Exceeding the bound logs (via the caller) but never retries.
    pub async fn stop(self, shutdown_timeout: Duration) -> bool {
        self.cancel.cancel();
        tokio::time::timeout(shutdown_timeout, self.task).await.is_ok()
    }
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Round `now` down to the most recent multiple of `interval_secs`.
pub(crate) fn align_boundary(now: i64, interval_secs: i64) -> i64 {
    now - now.rem_euclid(interval_secs)
}

/// Sleep for `duration` unless cancelled first; returns `true` if cancelled.
pub(crate) async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Sanitize a batch of candles and merge each into `store`.
pub(crate) fn sanitize_and_merge(candles: &[Candle], interval_secs: i64, store: &RwLock<CandleStore>) -> usize {
    let sanitized = processor::sanitize(candles, interval_secs);
    let mut guard = store.write();
    for c in &sanitized {
        processor::merge(c.clone(), &mut guard);
    }
    sanitized.len()
}

/// Fetch candles via the adapter's REST path and merge the sanitized result.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn fetch_and_merge(
    adapter: &dyn ExchangeAdapter,
    pair: &TradingPair,
    interval: &str,
    interval_secs: i64,
    start_time: Option<i64>,
    limit: Option<u32>,
    transport: Arc<dyn Transport>,
    store: &RwLock<CandleStore>,
) -> Result<usize> {
    let fetched = adapter
        .fetch_rest_candles(pair, interval, start_time, limit, transport)
        .await?;
    Ok(sanitize_and_merge(&fetched, interval_secs, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_boundary_rounds_down() {
        assert_eq!(align_boundary(125, 60), 120);
        assert_eq!(align_boundary(120, 60), 120);
    }
}
