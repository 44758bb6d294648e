// =============================================================================
// Host rate limiter abstraction
// =============================================================================
//
// When a host trading framework supplies its own transport, its rate
// limiter wraps every HTTP call and WS connect. Modeled as a named-bucket
// abstraction: `execute(limit_id)` hands back a scoped acquisition that is
// held for the duration of the call and released on drop. The built-in
// transport does not rate-limit beyond its connection-pool cap, so it never
// needs this trait.
// =============================================================================

use async_trait::async_trait;

/// A scoped rate-limit acquisition. Dropping it releases whatever slot or
/// token the limiter reserved.
pub trait RateLimitGuard: Send {}
impl<T: Send> RateLimitGuard for T {}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Acquire a slot in the named bucket `limit_id`, waiting if necessary.
    async fn execute(&self, limit_id: &str) -> Box<dyn RateLimitGuard>;
}

/// A limiter that never throttles -- used when no host limiter is supplied
/// and the built-in transport's pool cap is the only backpressure source.
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn execute(&self, _limit_id: &str) -> Box<dyn RateLimitGuard> {
        Box::new(())
    }
}
