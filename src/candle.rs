// =============================================================================
// Candle record — immutable OHLCV tuple
// =============================================================================
//
// Normalized, second-precision timestamp; identified solely by `open_time`.
// "Updating" a candle means constructing a new record and replacing whatever
// sits at that `open_time` in the store -- `Candle` itself never mutates.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub quote_volume: Option<f64>,
    #[serde(default)]
    pub n_trades: Option<u64>,
    #[serde(default)]
    pub taker_buy_base: Option<f64>,
    #[serde(default)]
    pub taker_buy_quote: Option<f64>,
}

impl Candle {
    /// Construct a candle, rejecting values that violate the OHLCV shape
    /// invariants (`ParseError` -- a malformed venue record never reaches
    /// the store).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        quote_volume: Option<f64>,
        n_trades: Option<u64>,
        taker_buy_base: Option<f64>,
        taker_buy_quote: Option<f64>,
    ) -> Result<Self> {
        let candle = Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            quote_volume,
            n_trades,
            taker_buy_base,
            taker_buy_quote,
        };
        candle.validate()?;
        Ok(candle)
    }

    pub fn validate(&self) -> Result<()> {
        let min_oc = self.open.min(self.close);
        let max_oc = self.open.max(self.close);
        if self.low > min_oc {
            return Err(FeedError::ParseError(format!(
                "candle at {}: low {} exceeds min(open, close) {}",
                self.open_time, self.low, min_oc
            )));
        }
        if self.low > self.high {
            return Err(FeedError::ParseError(format!(
                "candle at {}: low {} exceeds high {}",
                self.open_time, self.low, self.high
            )));
        }
        if self.high < max_oc {
            return Err(FeedError::ParseError(format!(
                "candle at {}: high {} below max(open, close) {}",
                self.open_time, self.high, max_oc
            )));
        }
        if self.volume < 0.0 {
            return Err(FeedError::ParseError(format!(
                "candle at {}: negative volume {}",
                self.open_time, self.volume
            )));
        }
        Ok(())
    }
}

impl PartialEq for Candle {
    fn eq(&self, other: &Self) -> bool {
        self.open_time == other.open_time
    }
}
impl Eq for Candle {}

impl PartialOrd for Candle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.open_time.cmp(&other.open_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(open_time: i64, close: f64) -> Candle {
        Candle::new(open_time, close, close, close, close, 0.0, None, None, None, None).unwrap()
    }

    #[test]
    fn equality_is_by_open_time_only() {
        let a = Candle::new(100, 1.0, 2.0, 0.5, 1.5, 10.0, None, None, None, None).unwrap();
        let b = Candle::new(100, 9.0, 9.0, 9.0, 9.0, 0.0, None, None, None, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_low_above_open_close() {
        let err = Candle::new(0, 1.0, 2.0, 1.5, 1.0, 1.0, None, None, None, None).unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
    }

    #[test]
    fn rejects_negative_volume() {
        let err = Candle::new(0, 1.0, 1.0, 1.0, 1.0, -1.0, None, None, None, None).unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
    }

    #[test]
    fn flat_candle_is_valid() {
        assert!(flat(0, 1.0).validate().is_ok());
    }
}
