// =============================================================================
// Kraken spot adapter
// =============================================================================
//
// REST-only for this port: Kraken's OHLC endpoint and pair-renaming quirks
// (BTC -> XBT, major-currency X/Z prefixing) ported from
// `original_source/candles_feed/adapters/kraken_spot/`. No `ws_*` overrides
// -- the adapter trait's defaults already raise `NotSupported`, exercising
// the "no-websocket" path so `auto` mode falls back to polling for every
// interval this adapter declares.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::{ExchangeAdapter, TestnetUrls, TimestampUnit};
use crate::candle::Candle;
use crate::error::{FeedError, Result};
use crate::network::{EndpointClass, NetworkConfig};
use crate::pair::TradingPair;

const EXCHANGE_NAME: &str = "kraken";

fn interval_table() -> HashMap<String, i64> {
    [
        ("1m", 60),
        ("5m", 300),
        ("15m", 900),
        ("30m", 1800),
        ("1h", 3600),
        ("4h", 14400),
        ("1d", 86400),
        ("1w", 604800),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn interval_to_kraken_minutes(interval: &str) -> i64 {
    match interval {
        "1m" => 1,
        "5m" => 5,
        "15m" => 15,
        "30m" => 30,
        "1h" => 60,
        "4h" => 240,
        "1d" => 1440,
        "1w" => 10080,
        _ => 1,
    }
}

pub struct KrakenAdapter {
    urls: TestnetUrls,
    config: NetworkConfig,
}

impl KrakenAdapter {
    pub fn new(config: NetworkConfig) -> Self {
        // Kraken has no public sandbox; this adapter only ever registers a
        // production URL, so asking for testnet raises NotSupported.
        let urls = TestnetUrls::new()
            .with_production(EndpointClass::Candles, "https://api.kraken.com/0/public/OHLC");
        Self { urls, config }
    }
}

#[async_trait]
impl ExchangeAdapter for KrakenAdapter {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    fn timestamp_unit(&self) -> TimestampUnit {
        TimestampUnit::Seconds
    }

    fn format_pair(&self, pair: &TradingPair) -> String {
        let mut base = pair.base().to_string();
        let mut quote = pair.quote().to_string();

        if base == "BTC" {
            base = "XBT".to_string();
        }
        if quote == "USDT" {
            quote = "USD".to_string();
        }
        if ["XBT", "ETH", "LTC", "XMR", "XRP", "ZEC"].contains(&base.as_str()) {
            base = format!("X{base}");
        }
        if ["USD", "EUR", "GBP", "JPY", "CAD"].contains(&quote.as_str()) {
            quote = format!("Z{quote}");
        }
        format!("{base}{quote}")
    }

    fn supported_intervals(&self) -> HashMap<String, i64> {
        interval_table()
    }

    fn ws_supported_intervals(&self) -> HashSet<String> {
        HashSet::new()
    }

    fn rest_url(&self, class: EndpointClass) -> Result<String> {
        self.urls.resolve(&self.config, class)
    }

    fn rest_params(
        &self,
        pair: &TradingPair,
        interval: &str,
        start_time: Option<i64>,
        _limit: Option<u32>,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("pair".to_string(), self.format_pair(pair)),
            ("interval".to_string(), interval_to_kraken_minutes(interval).to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("since".to_string(), self.timestamp_unit().encode(start)));
        }
        params
    }

    fn parse_rest_response(&self, bytes: &[u8]) -> Result<Vec<Candle>> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| FeedError::ParseError(format!("invalid kraken OHLC response: {e}")))?;

        let result = root
            .get("result")
            .and_then(|v| v.as_object())
            .ok_or_else(|| FeedError::ParseError("missing result object".to_string()))?;

        let mut candles = Vec::new();
        for (key, rows) in result {
            if key == "last" {
                continue;
            }
            let rows = rows
                .as_array()
                .ok_or_else(|| FeedError::ParseError("expected OHLC row array".to_string()))?;
            for row in rows {
                let row = row
                    .as_array()
                    .ok_or_else(|| FeedError::ParseError("expected OHLC row".to_string()))?;
                if row.len() < 8 {
                    return Err(FeedError::ParseError("OHLC row too short".to_string()));
                }
                let open_time = row[0]
                    .as_i64()
                    .ok_or_else(|| FeedError::ParseError("missing row time".to_string()))?;
                let open = parse_numeric(&row[1])?;
                let high = parse_numeric(&row[2])?;
                let low = parse_numeric(&row[3])?;
                let close = parse_numeric(&row[4])?;
                let vwap = parse_numeric(&row[5])?;
                let volume = parse_numeric(&row[6])?;
                let n_trades = row[7].as_u64();

                candles.push(Candle::new(
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    Some(volume * vwap),
                    n_trades,
                    None,
                    None,
                )?);
            }
        }
        Ok(candles)
    }
}

fn parse_numeric(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| FeedError::ParseError(format!("not a valid f64: {s}"))),
        Value::Number(n) => n.as_f64().ok_or_else(|| FeedError::ParseError("not a valid f64".to_string())),
        _ => Err(FeedError::ParseError("unexpected JSON type".to_string())),
    }
}

pub fn register_exchange() {
    crate::registry::register(
        EXCHANGE_NAME,
        Arc::new(|config| Arc::new(KrakenAdapter::new(config)) as Arc<dyn ExchangeAdapter>),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pair_applies_kraken_quirks() {
        let adapter = KrakenAdapter::new(NetworkConfig::production());
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        assert_eq!(adapter.format_pair(&pair), "XXBTZUSD");
    }

    #[test]
    fn ws_operations_are_not_supported() {
        let adapter = KrakenAdapter::new(NetworkConfig::production());
        assert!(adapter.ws_url().is_err());
        let pair = TradingPair::parse("BTC-USD").unwrap();
        assert!(adapter.ws_subscribe_payload(&pair, "1m").is_err());
    }

    #[test]
    fn parse_rest_response_handles_documented_shape() {
        let adapter = KrakenAdapter::new(NetworkConfig::production());
        let body = serde_json::json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [1616662800, "52556.5", "52650.0", "52450.0", "52483.4", "52519.9", "56.72067891", 158]
                ],
                "last": 1616691600i64
            }
        })
        .to_string();
        let candles = adapter.parse_rest_response(body.as_bytes()).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 1_616_662_800);
        assert_eq!(candles[0].n_trades, Some(158));
    }

    #[test]
    fn testnet_is_not_supported() {
        let adapter = KrakenAdapter::new(NetworkConfig::testnet());
        assert!(adapter.rest_url(EndpointClass::Candles).is_err());
    }
}
