// =============================================================================
// candle-feed — library surface
// =============================================================================
//
// Re-exports the public types a host embeds (§6): register adapters, build
// a `Feed` per (exchange, pair, interval), start/stop/fetch/snapshot it.
// =============================================================================

pub mod adapter;
pub mod adapters;
pub mod candle;
pub mod config;
pub mod error;
pub mod feed;
pub mod interval;
pub mod network;
pub mod pair;
pub mod processor;
pub mod registry;
pub mod status;
pub mod store;
pub mod strategy;
pub mod transport;

pub use adapter::{ExchangeAdapter, TimestampUnit};
pub use candle::Candle;
pub use config::EngineConfig;
pub use error::{FeedError, Result};
pub use feed::{Feed, FeedBuilder};
pub use interval::Interval;
pub use network::{EndpointClass, NetworkConfig, NetworkEnvironment};
pub use pair::TradingPair;
pub use registry::{list_exchanges, register, resolve, AdapterFactory};
pub use strategy::StartMode;

/// Register the adapters shipped with this crate. Idempotent.
pub fn register_builtin_adapters() {
    adapters::register_all();
}
