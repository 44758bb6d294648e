// =============================================================================
// Streaming strategy — WebSocket session lifecycle
// =============================================================================
//
// `idle -> prefilling -> connecting -> subscribed -> reconnecting ->
// stopping -> stopped` per §4.8. Backoff on reconnect is capped exponential
// with jitter (1s, 2s, 4s, ..., capped at 30s, each scaled by a random
// 0.8-1.0 factor to avoid synchronized reconnect storms against the same
// venue) -- a documented divergence from the source's fixed 1s floor, reset
// to 1s on every successful subscribe.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::adapter::ExchangeAdapter;
use crate::config::BackoffPolicy;
use crate::pair::TradingPair;
use crate::store::CandleStore;
use crate::transport::Transport;

use super::{align_boundary, fetch_and_merge, now_secs, sanitize_and_merge, sleep_or_cancel};

fn next_backoff(current: Duration, max: Duration) -> Duration {
    let doubled = (current * 2).min(max);
    jitter(doubled)
}

/// Scale `duration` by a random factor in `[0.8, 1.0]`.
fn jitter(duration: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..=1.0);
    Duration::from_secs_f64(duration.as_secs_f64() * factor)
}

fn message_text(message: Message) -> Option<String> {
    match message {
        Message::Text(t) => Some(t),
        Message::Binary(b) => String::from_utf8(b).ok(),
        // Ping/Pong/Close/Frame carry no candle data.
        _ => None,
    }
}

/// Drive the streaming state machine until cancelled.
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
    connect_timeout: Duration,
    backoff_policy: BackoffPolicy,
    cancel: CancellationToken,
) {
    // prefilling
    if store.read().is_empty() {
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
            warn!(error = %e, "streaming strategy prefill failed");
        }
    }

    let initial_backoff = Duration::from_secs(backoff_policy.initial_secs.max(1));
    let max_backoff = Duration::from_secs(backoff_policy.max_secs).max(initial_backoff);
    let mut backoff = initial_backoff;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        // connecting
        let ws_url = match adapter.ws_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "streaming strategy has no ws_url, giving up");
                return;
            }
        };
        let mut session = match transport.ws_connect(&ws_url, connect_timeout).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, ?backoff, "ws connect failed, backing off");
                if sleep_or_cancel(backoff, &cancel).await {
                    return;
                }
                backoff = next_backoff(backoff, max_backoff);
                continue;
            }
        };

        // subscribed
        let payload = match adapter.ws_subscribe_payload(&pair, &interval) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "ws subscribe payload build failed, giving up");
                session.close().await;
                return;
            }
        };
        if let Err(e) = session.send_text(payload).await {
            warn!(error = %e, ?backoff, "ws subscribe send failed, reconnecting");
            session.close().await;
            if sleep_or_cancel(backoff, &cancel).await {
                return;
            }
            backoff = next_backoff(backoff, max_backoff);
            continue;
        }

        backoff = initial_backoff;
        let mut last_known = store.read().last_open_time();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    session.close().await;
                    info!("streaming strategy stopping");
                    return;
                }
                msg = session.next_message() => msg,
            };

            let frame = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(error = %e, ?backoff, "ws read error, reconnecting");
                    session.close().await;
                    if sleep_or_cancel(backoff, &cancel).await {
                        return;
                    }
                    backoff = next_backoff(backoff, max_backoff);
                    break;
                }
                None => {
                    warn!(?backoff, "ws stream ended, reconnecting");
                    session.close().await;
                    if sleep_or_cancel(backoff, &cancel).await {
                        return;
                    }
                    backoff = next_backoff(backoff, max_backoff);
                    break;
                }
            };

            let Some(text) = message_text(frame) else { continue };

            let candles = match adapter.parse_ws_message(&text) {
                Ok(Some(candles)) => candles,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "dropping unparseable ws frame");
                    continue;
                }
            };

            for candle in &candles {
                if let Some(prev) = last_known {
                    if candle.open_time > prev + interval_secs {
                        let gap_candles = (candle.open_time - prev) / interval_secs - 1;
                        info!(gap_candles, "gap detected, backfilling");
                        let backfill_start = prev + interval_secs;
                        if let Err(e) = fetch_and_merge(
                            adapter.as_ref(),
                            &pair,
                            &interval,
                            interval_secs,
                            Some(backfill_start),
                            Some((gap_candles + 1) as u32),
                            transport.clone(),
                            &store,
                        )
                        .await
                        {
                            warn!(error = %e, "gap backfill failed, continuing with live frames");
                        }
                    }
                }
                last_known = Some(last_known.map_or(candle.open_time, |p| p.max(candle.open_time)));
            }

            sanitize_and_merge(&candles, interval_secs, &store);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockAdapter;
    use crate::candle::Candle;
    use crate::network::NetworkConfig;

    #[test]
    fn message_text_extracts_text_frames() {
        assert_eq!(message_text(Message::Text("hi".to_string())), Some("hi".to_string()));
        assert_eq!(message_text(Message::Ping(vec![])), None);
    }

    #[test]
    fn next_backoff_caps_at_thirty_seconds_within_jitter() {
        let initial = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        let mut b = initial;
        for _ in 0..10 {
            b = next_backoff(b, max);
            assert!(b <= max);
        }
        // After enough doublings the un-jittered base is pinned at the cap;
        // jitter only ever scales it down, never past the 0.8 floor.
        assert!(b >= max.mul_f64(0.8));
    }

    #[test]
    fn parse_ws_message_roundtrip_via_mock() {
        let adapter = MockAdapter::new(NetworkConfig::production());
        let wire = serde_json::json!({
            "open_time": 1_700_000_060i64,
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 0.0
        })
        .to_string();
        let candles: Vec<Candle> = adapter.parse_ws_message(&wire).unwrap().unwrap();
        assert_eq!(candles[0].open_time, 1_700_000_060);
    }
}
