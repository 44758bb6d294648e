// =============================================================================
// Canonical trading pair
// =============================================================================
//
// The engine's public surface always speaks `BASE-QUOTE` (uppercase);
// adapters translate to whatever the venue's wire format requires.
// =============================================================================

use crate::error::{FeedError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Parse a canonical `BASE-QUOTE` string, e.g. `BTC-USDT`.
    pub fn parse(s: &str) -> Result<Self> {
        let (base, quote) = s
            .split_once('-')
            .ok_or_else(|| FeedError::InvalidPair(s.to_string()))?;
        if base.is_empty() || quote.is_empty() {
            return Err(FeedError::InvalidPair(s.to_string()));
        }
        Ok(Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn canonical(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl std::str::FromStr for TradingPair {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        TradingPair::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases() {
        let p = TradingPair::parse("btc-usdt").unwrap();
        assert_eq!(p.base(), "BTC");
        assert_eq!(p.quote(), "USDT");
        assert_eq!(p.canonical(), "BTC-USDT");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(TradingPair::parse("BTCUSDT").is_err());
    }

    #[test]
    fn rejects_empty_side() {
        assert!(TradingPair::parse("-USDT").is_err());
        assert!(TradingPair::parse("BTC-").is_err());
    }
}
