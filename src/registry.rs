// =============================================================================
// Adapter registry — name -> adapter-factory mapping
// =============================================================================
//
// Process-wide, populated once at init by explicit `register()` calls (one
// per adapter module), then read by many. No filesystem auto-discovery --
// that is not meaningful for a statically linked binary; adapters register
// themselves from `main.rs`/`lib.rs` init instead.
// =============================================================================

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::adapter::ExchangeAdapter;
use crate::error::{FeedError, Result};
use crate::network::NetworkConfig;

pub type AdapterFactory = Arc<dyn Fn(NetworkConfig) -> Arc<dyn ExchangeAdapter> + Send + Sync>;

struct Registry {
    factories: HashMap<String, AdapterFactory>,
    order: Vec<String>,
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(Registry {
            factories: HashMap::new(),
            order: Vec::new(),
        })
    })
}

/// Register an adapter factory under `name`. Intended to be called once per
/// adapter module at process init, before any feed is created.
pub fn register(name: impl Into<String>, factory: AdapterFactory) {
    let name = name.into();
    let mut reg = registry().write().expect("registry lock poisoned");
    if !reg.factories.contains_key(&name) {
        reg.order.push(name.clone());
    }
    reg.factories.insert(name, factory);
}

/// Construct a fresh adapter bound to `config`, or `UnknownExchange` if no
/// adapter is registered under `name`.
pub fn resolve(name: &str, config: NetworkConfig) -> Result<Arc<dyn ExchangeAdapter>> {
    let reg = registry().read().expect("registry lock poisoned");
    let factory = reg
        .factories
        .get(name)
        .ok_or_else(|| FeedError::UnknownExchange(name.to_string()))?;
    Ok(factory(config))
}

/// Registered exchange names, in registration order.
pub fn list_exchanges() -> Vec<String> {
    let reg = registry().read().expect("registry lock poisoned");
    reg.order.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockAdapter;

    fn factory() -> AdapterFactory {
        Arc::new(|config| Arc::new(MockAdapter::new(config)) as Arc<dyn ExchangeAdapter>)
    }

    #[test]
    fn resolve_unknown_exchange_errors() {
        let err = resolve("does-not-exist-xyz", NetworkConfig::production()).unwrap_err();
        assert!(matches!(err, FeedError::UnknownExchange(_)));
    }

    #[test]
    fn register_then_resolve_round_trips() {
        register("registry-test-mock", factory());
        let adapter = resolve("registry-test-mock", NetworkConfig::production()).unwrap();
        assert_eq!(adapter.name(), "mock");
        assert!(list_exchanges().contains(&"registry-test-mock".to_string()));
    }
}
