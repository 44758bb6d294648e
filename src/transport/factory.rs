// =============================================================================
// Transport factory
// =============================================================================
//
// Selection rule (§4.4 / §4.9): if a host transport bundle (a rate-limiter
// and a session factory standing in for the host's own HTTP client) is
// supplied at feed construction, use it; otherwise fall back to the
// built-in transport. The core's call sites are identical either way.
// =============================================================================

use std::sync::Arc;

use super::{BuiltinTransport, HostTransport, HttpConfig, RateLimiter, Transport};

/// Bundle a host trading framework provides in place of the built-in
/// transport: its rate limiter plus the transport it wants used for actual
/// I/O (typically a thin wrapper the host already has around its own HTTP
/// client and WS session factory).
pub struct HostTransportBundle {
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub transport: Arc<dyn Transport>,
}

pub fn resolve_transport(
    host_bundle: Option<HostTransportBundle>,
    http_config: HttpConfig,
) -> Arc<dyn Transport> {
    match host_bundle {
        Some(bundle) => Arc::new(HostTransport::new(bundle.transport, bundle.rate_limiter)),
        None => Arc::new(BuiltinTransport::new(http_config)),
    }
}
