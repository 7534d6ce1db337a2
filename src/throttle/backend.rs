//! Throttle trait for abstracting over limiter implementations.

use async_trait::async_trait;

use super::limiter::SlidingWindowLimiter;

/// An acquire/release bracket around a unit of work.
///
/// Callers invoke `acquire` immediately before the guarded work and `release`
/// unconditionally afterwards, whether the work succeeded or not.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Wait until the caller may enter the guarded block.
    async fn acquire(&self);

    /// Leave the guarded block.
    fn release(&self);
}

#[async_trait]
impl Throttle for SlidingWindowLimiter {
    async fn acquire(&self) {
        SlidingWindowLimiter::acquire(self).await
    }

    fn release(&self) {
        SlidingWindowLimiter::release(self)
    }
}
