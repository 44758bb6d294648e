// =============================================================================
// Polling strategy — timer-driven REST pull
// =============================================================================
//
// `idle -> initializing -> steady -> stopping -> stopped` per §4.7. Selected
// when the adapter does not stream the requested interval, or the caller
// explicitly forces polling.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::adapter::ExchangeAdapter;
use crate::candle::Candle;
use crate::error::Result;
use crate::pair::TradingPair;
use crate::processor;
use crate::store::CandleStore;
use crate::transport::Transport;

use super::{align_boundary, fetch_and_merge, now_secs, sleep_or_cancel};

const RETRY_SLEEP: Duration = Duration::from_secs(1);

/// One-shot fetch that never touches a feed's steady-state store -- used by
/// the coordinator's `fetch` and by ad-hoc historical queries.
pub async fn poll_once(
    adapter: &dyn ExchangeAdapter,
    pair: &TradingPair,
    interval: &str,
    interval_secs: i64,
    start_time: Option<i64>,
    end_time: Option<i64>,
    limit: Option<u32>,
    transport: Arc<dyn Transport>,
) -> Result<Vec<Candle>> {
    let end = end_time.unwrap_or_else(|| align_boundary(now_secs(), interval_secs));
    let start = start_time.or_else(|| limit.map(|l| end - (l as i64) * interval_secs));
    let fetched = adapter
        .fetch_rest_candles(pair, interval, start, limit, transport)
        .await?;
    Ok(processor::sanitize(&fetched, interval_secs))
}

/// Drive the steady-state polling loop until cancelled.
#[instrument(skip_all, fields(pair = %pair, interval = %interval))]
#[allow(clippy::too_many_arguments)]
pub async fn run(
    adapter: Arc<dyn ExchangeAdapter>,
    pair: TradingPair,
    interval: String,
    interval_secs: i64,
    capacity: usize,
    transport: Arc<dyn Transport>,
    store: Arc<RwLock<CandleStore>>,
    cancel: CancellationToken,
) {
    // initializing: fetch up to `capacity` candles ending at the current
    // interval-aligned boundary.
    let end = align_boundary(now_secs(), interval_secs);
    let start = end - (capacity as i64) * interval_secs;
    if let Err(e) = fetch_and_merge(
        adapter.as_ref(),
        &pair,
        &interval,
        interval_secs,
        Some(start),
        Some(capacity as u32),
        transport.clone(),
        &store,
    )
    .await
    {
        warn!(error = %e, "polling strategy initial fill failed");
    }

    // steady
    loop {
        let sleep_secs = (interval_secs as f64 / 2.0).max(1.0);
        if sleep_or_cancel(Duration::from_secs_f64(sleep_secs), &cancel).await {
            info!("polling strategy stopping");
            return;
        }

        // "Last complete" candle: the most recent store entry whose
        // open_time + interval_secs <= now. If the store's newest entry is
        // still in-progress, step back one interval so the refetch also
        // re-covers it (merge idempotence makes the overlap harmless).
        let now = now_secs();
        let last_known = store.read().last_open_time();
        let start_time = match last_known {
            Some(ot) if ot + interval_secs <= now => ot,
            Some(ot) => ot - interval_secs,
            None => align_boundary(now, interval_secs) - interval_secs,
        };

        if let Err(e) = fetch_and_merge(
            adapter.as_ref(),
            &pair,
            &interval,
            interval_secs,
            Some(start_time),
            None,
            transport.clone(),
            &store,
        )
        .await
        {
            warn!(error = %e, "polling tick failed, retrying in 1s");
            if sleep_or_cancel(RETRY_SLEEP, &cancel).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockAdapter;
    use crate::network::NetworkConfig;
    use crate::transport::factory::resolve_transport;
    use crate::transport::HttpConfig;

    fn candle(open_time: i64) -> Candle {
        Candle::new(open_time, 1.0, 1.0, 1.0, 1.0, 0.0, None, None, None, None).unwrap()
    }

    #[tokio::test]
    async fn poll_once_sanitizes_fetched_candles() {
        let adapter = MockAdapter::new(NetworkConfig::production());
        adapter.push_rest_batch(vec![candle(60), candle(120), candle(180)]);
        let transport = resolve_transport(None, HttpConfig::default());
        let pair = TradingPair::parse("BTC-USDT").unwrap();

        let out = poll_once(&adapter, &pair, "1m", 60, None, None, None, transport)
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn run_performs_initial_fill_then_stops_on_cancel() {
        let mock = MockAdapter::new(NetworkConfig::production());
        mock.push_rest_batch(vec![candle(60), candle(120), candle(180)]);
        let adapter: Arc<dyn crate::adapter::ExchangeAdapter> = Arc::new(mock);
        let transport = resolve_transport(None, HttpConfig::default());
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let store = Arc::new(RwLock::new(CandleStore::new(3, 60)));
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let store_clone = store.clone();
        let handle = tokio::spawn(async move {
            run(
                adapter,
                pair,
                "1m".to_string(),
                60,
                3,
                transport,
                store_clone,
                cancel_clone,
            )
            .await;
        });

        // Give the initial fill a moment to land, then stop.
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

        assert_eq!(store.read().len(), 3);
    }
}
