// =============================================================================
// Candle interval catalog
// =============================================================================
//
// Canonical interval strings and their duration in seconds. Adapters declare
// the subset they support over REST (`supported_intervals`) and over
// WebSocket (`ws_supported_intervals`); the engine never invents intervals
// outside this fixed table.
// =============================================================================

use crate::error::{FeedError, Result};

/// One of the fixed, canonical interval strings the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(&'static str);

const TABLE: &[(&str, i64)] = &[
    ("1m", 60),
    ("3m", 180),
    ("5m", 300),
    ("15m", 900),
    ("30m", 1800),
    ("1h", 3600),
    ("2h", 7200),
    ("4h", 14400),
    ("6h", 21600),
    ("8h", 28800),
    ("12h", 43200),
    ("1d", 86400),
    ("3d", 259200),
    ("1w", 604800),
    ("1M", 2592000),
];

impl Interval {
    /// Parse a canonical interval string, rejecting anything not in the
    /// fixed catalog (`UnsupportedInterval` per the engine's error taxonomy).
    pub fn parse(s: &str) -> Result<Self> {
        TABLE
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(name, _)| Interval(name))
            .ok_or_else(|| FeedError::UnsupportedInterval(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn seconds(&self) -> i64 {
        TABLE.iter().find(|(name, _)| *name == self.0).unwrap().1
    }

    /// All canonical interval strings, in the fixed catalog order.
    pub fn all() -> impl Iterator<Item = Interval> {
        TABLE.iter().map(|(name, _)| Interval(name))
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Interval {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        Interval::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_intervals() {
        assert_eq!(Interval::parse("1m").unwrap().seconds(), 60);
        assert_eq!(Interval::parse("1h").unwrap().seconds(), 3600);
        assert_eq!(Interval::parse("1M").unwrap().seconds(), 2_592_000);
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = Interval::parse("17m").unwrap_err();
        assert!(matches!(err, FeedError::UnsupportedInterval(_)));
    }

    #[test]
    fn all_yields_fifteen_entries() {
        assert_eq!(Interval::all().count(), 15);
    }
}
