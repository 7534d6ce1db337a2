//! Throttler - Sliding Window Rate Limiting
//!
//! This crate bounds how often callers may enter a guarded block of work.
//! At most `rate_limit` admissions are granted within any trailing window of
//! `period`; callers over the limit are delayed until a slot frees up, never
//! rejected.

pub mod config;
pub mod error;
pub mod throttle;

pub use error::{Result, ThrottlerError};
pub use throttle::{SlidingWindowLimiter, Throttle, ThrottleGuard, ThrottleRegistry};
