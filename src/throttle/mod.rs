//! Sliding window throttling and named throttle management.

mod backend;
mod limiter;
mod registry;
mod window;

pub use backend::Throttle;
pub use limiter::{SlidingWindowLimiter, ThrottleGuard};
pub use registry::ThrottleRegistry;
