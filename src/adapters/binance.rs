// =============================================================================
// Binance spot adapter
// =============================================================================
//
// REST + WebSocket kline parsing ported from the teacher's
// `market_data::candle_buffer` (JSON shape, field layout) and
// `binance::client` (signed-client pattern, used here only for the public
// base URL and the weight tracker -- candle endpoints are public so no
// signing is required). Supports testnet for the candles endpoint class.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{ExchangeAdapter, TestnetUrls, TimestampUnit};
use crate::candle::Candle;
use crate::error::{FeedError, Result};
use crate::network::{EndpointClass, NetworkConfig};
use crate::pair::TradingPair;

const EXCHANGE_NAME: &str = "binance";

fn interval_table() -> HashMap<String, i64> {
    crate::interval::Interval::all()
        .map(|i| (i.as_str().to_string(), i.seconds()))
        .collect()
}

fn ws_interval_table() -> HashSet<String> {
    // Binance streams every interval it lists over REST.
    interval_table().into_keys().collect()
}

/// Thin weight tracker retained from the teacher's `binance::rate_limit`;
/// order-count tracking was dropped since this engine never places orders.
#[derive(Default)]
pub struct WeightTracker {
    used_weight_1m: AtomicU32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub used_weight_1m: u32,
}

impl WeightTracker {
    pub fn update_from_header(&self, value: Option<&str>) {
        if let Some(w) = value.and_then(|v| v.parse::<u32>().ok()) {
            self.used_weight_1m.store(w, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            used_weight_1m: self.used_weight_1m.load(Ordering::Relaxed),
        }
    }
}

pub struct BinanceAdapter {
    urls: TestnetUrls,
    ws_base: String,
    config: NetworkConfig,
    pub weight: WeightTracker,
}

impl BinanceAdapter {
    pub fn new(config: NetworkConfig) -> Self {
        let urls = TestnetUrls::new()
            .with_production(EndpointClass::Candles, "https://api.binance.com/api/v3/klines")
            .with_testnet(EndpointClass::Candles, "https://testnet.binance.vision/api/v3/klines");
        Self {
            urls,
            ws_base: "wss://stream.binance.com:9443/ws".to_string(),
            config,
            weight: WeightTracker::default(),
        }
    }

    fn parse_kline_row(row: &[Value]) -> Result<Candle> {
        if row.len() < 11 {
            return Err(FeedError::ParseError("kline row too short".to_string()));
        }
        let open_time_ms = row[0]
            .as_i64()
            .ok_or_else(|| FeedError::ParseError("missing open time".to_string()))?;
        let open = parse_f64(&row[1], "open")?;
        let high = parse_f64(&row[2], "high")?;
        let low = parse_f64(&row[3], "low")?;
        let close = parse_f64(&row[4], "close")?;
        let volume = parse_f64(&row[5], "volume")?;
        let quote_volume = parse_f64(&row[7], "quote_volume").ok();
        let n_trades = row[8].as_u64();
        let taker_buy_base = parse_f64(&row[9], "taker_buy_base").ok();
        let taker_buy_quote = parse_f64(&row[10], "taker_buy_quote").ok();

        Candle::new(
            open_time_ms / 1000,
            open,
            high,
            low,
            close,
            volume,
            quote_volume,
            n_trades,
            taker_buy_base,
            taker_buy_quote,
        )
    }
}

fn parse_f64(value: &Value, field: &str) -> Result<f64> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| FeedError::ParseError(format!("field {field} is not a valid f64: {s}"))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FeedError::ParseError(format!("field {field} is not a valid f64"))),
        _ => Err(FeedError::ParseError(format!("field {field} has unexpected JSON type"))),
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    fn timestamp_unit(&self) -> TimestampUnit {
        TimestampUnit::Millis
    }

    fn format_pair(&self, pair: &TradingPair) -> String {
        format!("{}{}", pair.base(), pair.quote())
    }

    fn supported_intervals(&self) -> HashMap<String, i64> {
        interval_table()
    }

    fn ws_supported_intervals(&self) -> HashSet<String> {
        ws_interval_table()
    }

    fn rest_url(&self, class: EndpointClass) -> Result<String> {
        self.urls.resolve(&self.config, class)
    }

    fn rest_params(
        &self,
        pair: &TradingPair,
        interval: &str,
        start_time: Option<i64>,
        limit: Option<u32>,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("symbol".to_string(), self.format_pair(pair)),
            ("interval".to_string(), interval.to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime".to_string(), self.timestamp_unit().encode(start)));
        }
        if let Some(limit) = limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    fn parse_rest_response(&self, bytes: &[u8]) -> Result<Vec<Candle>> {
        let rows: Vec<Vec<Value>> = serde_json::from_slice(bytes)
            .map_err(|e| FeedError::ParseError(format!("invalid kline array: {e}")))?;
        rows.iter().map(|row| Self::parse_kline_row(row)).collect()
    }

    fn ws_url(&self) -> Result<String> {
        Ok(self.ws_base.clone())
    }

    fn ws_subscribe_payload(&self, pair: &TradingPair, interval: &str) -> Result<String> {
        let stream = format!("{}@kline_{}", self.format_pair(pair).to_lowercase(), interval);
        Ok(serde_json::json!({
            "method": "SUBSCRIBE",
            "params": [stream],
            "id": 1,
        })
        .to_string())
    }

    fn parse_ws_message(&self, frame: &str) -> Result<Option<Vec<Candle>>> {
        let root: Value = serde_json::from_str(frame)
            .map_err(|e| FeedError::ParseError(format!("invalid ws json: {e}")))?;

        let data = if root.get("data").is_some() { &root["data"] } else { &root };
        let k = &data["k"];
        if k.is_null() {
            // Heartbeat, subscription ack, or non-kline event.
            return Ok(None);
        }

        let open_time_ms = k["t"]
            .as_i64()
            .ok_or_else(|| FeedError::ParseError("missing field k.t".to_string()))?;
        let open = parse_f64(&k["o"], "k.o")?;
        let high = parse_f64(&k["h"], "k.h")?;
        let low = parse_f64(&k["l"], "k.l")?;
        let close = parse_f64(&k["c"], "k.c")?;
        let volume = parse_f64(&k["v"], "k.v")?;
        let quote_volume = parse_f64(&k["q"], "k.q").ok();
        let n_trades = k["n"].as_u64();
        let taker_buy_base = parse_f64(&k["V"], "k.V").ok();
        let taker_buy_quote = parse_f64(&k["Q"], "k.Q").ok();

        let candle = Candle::new(
            open_time_ms / 1000,
            open,
            high,
            low,
            close,
            volume,
            quote_volume,
            n_trades,
            taker_buy_base,
            taker_buy_quote,
        )?;
        Ok(Some(vec![candle]))
    }
}

/// Register this adapter under the process-wide registry.
pub fn register_exchange() {
    crate::registry::register(
        EXCHANGE_NAME,
        Arc::new(|config| Arc::new(BinanceAdapter::new(config)) as Arc<dyn ExchangeAdapter>),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pair_concatenates_base_and_quote() {
        let adapter = BinanceAdapter::new(NetworkConfig::production());
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        assert_eq!(adapter.format_pair(&pair), "BTCUSDT");
    }

    #[test]
    fn parse_rest_response_round_trips_known_shape() {
        let adapter = BinanceAdapter::new(NetworkConfig::production());
        let body = serde_json::json!([
            [1700000000000i64, "100.0", "101.0", "99.0", "100.5", "10.0",
             1700000059999i64, "1005.0", 5, "6.0", "603.0", "0"]
        ])
        .to_string();
        let candles = adapter.parse_rest_response(body.as_bytes()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 1_700_000_000);
        assert_eq!(candles[0].close, 100.5);
        assert_eq!(candles[0].n_trades, Some(5));
    }

    #[test]
    fn parse_ws_message_ignores_non_kline_frames() {
        let adapter = BinanceAdapter::new(NetworkConfig::production());
        let frame = serde_json::json!({"result": null, "id": 1}).to_string();
        assert!(adapter.parse_ws_message(&frame).unwrap().is_none());
    }

    #[test]
    fn parse_ws_message_extracts_single_candle() {
        let adapter = BinanceAdapter::new(NetworkConfig::production());
        let frame = serde_json::json!({
            "e": "kline",
            "s": "BTCUSDT",
            "k": {
                "t": 1700000000000i64, "T": 1700000059999i64, "i": "1m",
                "o": "100.0", "h": "101.0", "l": "99.0", "c": "100.5",
                "v": "10.0", "q": "1005.0", "n": 5,
                "V": "6.0", "Q": "603.0", "x": false
            }
        })
        .to_string();
        let candles = adapter.parse_ws_message(&frame).unwrap().unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 1_700_000_000);
    }

    #[test]
    fn ws_supported_intervals_matches_rest_catalog() {
        let adapter = BinanceAdapter::new(NetworkConfig::production());
        assert_eq!(adapter.ws_supported_intervals().len(), adapter.supported_intervals().len());
    }

    #[test]
    fn testnet_resolves_separate_url() {
        let adapter = BinanceAdapter::new(NetworkConfig::testnet());
        let url = adapter.rest_url(EndpointClass::Candles).unwrap();
        assert!(url.contains("testnet"));
    }
}
