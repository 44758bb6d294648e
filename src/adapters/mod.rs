// =============================================================================
// Concrete adapters
// =============================================================================
//
// Each submodule implements `crate::adapter::ExchangeAdapter` for one venue
// and exposes a `register_exchange()` that wires it into the process-wide
// registry (`crate::registry`). `register_all` is the convenience the host
// binary calls at startup; library consumers may instead call the
// per-adapter functions to register only what they need.
// =============================================================================

pub mod binance;
pub mod kraken;
pub mod mock;

/// Register every built-in adapter. Safe to call more than once --
/// `crate::registry::register` is idempotent per name.
pub fn register_all() {
    binance::register_exchange();
    kraken::register_exchange();
    mock::register_exchange();
}
