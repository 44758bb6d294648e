// =============================================================================
// Testnet-support helper
// =============================================================================
//
// Adapters that support a sandbox environment embed a `TestnetUrls` table
// mapping each endpoint class to its production and testnet URL, then call
// `resolve` from their `rest_url`/`ws_url` implementations. Adapters that
// do not support testnet simply never construct one -- asking such an
// adapter for a testnet URL has no codepath to reach, by construction.
// =============================================================================

use std::collections::HashMap;

use crate::error::{FeedError, Result};
use crate::network::{EndpointClass, NetworkConfig};

#[derive(Debug, Clone, Default)]
pub struct TestnetUrls {
    production: HashMap<EndpointClass, String>,
    testnet: HashMap<EndpointClass, String>,
}

impl TestnetUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_production(mut self, class: EndpointClass, url: impl Into<String>) -> Self {
        self.production.insert(class, url.into());
        self
    }

    pub fn with_testnet(mut self, class: EndpointClass, url: impl Into<String>) -> Self {
        self.testnet.insert(class, url.into());
        self
    }

    /// Resolve the URL for `class` given the feed's network config.
    /// `NotSupported` if the adapter never registered a testnet URL for a
    /// class the config asks to run against testnet.
    pub fn resolve(&self, config: &NetworkConfig, class: EndpointClass) -> Result<String> {
        if config.is_testnet_for(class) {
            self.testnet
                .get(&class)
                .cloned()
                .ok_or_else(|| FeedError::NotSupported(format!("no testnet URL for {class:?}")))
        } else {
            self.production
                .get(&class)
                .cloned()
                .ok_or_else(|| FeedError::NotSupported(format!("no production URL for {class:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_production_by_default() {
        let urls = TestnetUrls::new().with_production(EndpointClass::Candles, "https://prod");
        let cfg = NetworkConfig::production();
        assert_eq!(urls.resolve(&cfg, EndpointClass::Candles).unwrap(), "https://prod");
    }

    #[test]
    fn resolves_testnet_when_configured() {
        let urls = TestnetUrls::new()
            .with_production(EndpointClass::Candles, "https://prod")
            .with_testnet(EndpointClass::Candles, "https://test");
        let cfg = NetworkConfig::testnet();
        assert_eq!(urls.resolve(&cfg, EndpointClass::Candles).unwrap(), "https://test");
    }

    #[test]
    fn missing_testnet_url_is_not_supported() {
        let urls = TestnetUrls::new().with_production(EndpointClass::Candles, "https://prod");
        let cfg = NetworkConfig::testnet();
        assert!(matches!(
            urls.resolve(&cfg, EndpointClass::Candles),
            Err(FeedError::NotSupported(_))
        ));
    }
}
