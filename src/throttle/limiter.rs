//! Sliding window limiter implementation.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use super::window::{Admission, Window};
use crate::error::{Result, ThrottlerError};

/// Limits entries into a guarded block to `rate_limit` per trailing `period`.
///
/// Callers over the limit are suspended until the oldest admission leaves
/// the window; nobody is ever rejected. The admit-or-wait decision runs under
/// a per-instance lock so the bound holds on multi-threaded runtimes too, but
/// the lock is never held while a caller sleeps.
///
/// No fairness is guaranteed between waiters: whichever wakes first and finds
/// a free slot wins it.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    /// Maximum admissions in any trailing window
    rate_limit: usize,
    /// Length of the trailing window
    period: Duration,
    /// Timestamps of counted admissions
    window: Mutex<Window>,
}

impl SlidingWindowLimiter {
    /// Create a new limiter.
    ///
    /// Fails with [`ThrottlerError::InvalidConfiguration`] if `rate_limit` is
    /// zero or `period` is empty.
    pub fn new(rate_limit: usize, period: Duration) -> Result<Self> {
        if rate_limit == 0 {
            return Err(ThrottlerError::InvalidConfiguration(
                "rate_limit must be greater than zero".to_string(),
            ));
        }
        if period.is_zero() {
            return Err(ThrottlerError::InvalidConfiguration(
                "period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            rate_limit,
            period,
            window: Mutex::new(Window::new(rate_limit)),
        })
    }

    /// Create a new limiter from untyped numbers, e.g. values read from a
    /// configuration file.
    pub fn from_secs_f64(rate_limit: i64, period_secs: f64) -> Result<Self> {
        if rate_limit <= 0 {
            return Err(ThrottlerError::InvalidConfiguration(format!(
                "rate_limit must be greater than zero, got {}",
                rate_limit
            )));
        }
        if !period_secs.is_finite() || period_secs <= 0.0 {
            return Err(ThrottlerError::InvalidConfiguration(format!(
                "period must be a positive number of seconds, got {}",
                period_secs
            )));
        }

        let rate_limit = usize::try_from(rate_limit).map_err(|_| {
            ThrottlerError::InvalidConfiguration(format!("rate_limit {} is too large", rate_limit))
        })?;
        let period = Duration::try_from_secs_f64(period_secs).map_err(|e| {
            ThrottlerError::InvalidConfiguration(format!("period {}: {}", period_secs, e))
        })?;

        Self::new(rate_limit, period)
    }

    /// Create a limiter with the same limits and an empty history.
    pub fn fresh(&self) -> Self {
        Self {
            rate_limit: self.rate_limit,
            period: self.period,
            window: Mutex::new(Window::new(self.rate_limit)),
        }
    }

    /// Wait until entering the guarded block keeps the window within its
    /// limit, then record the admission.
    ///
    /// Dropping the returned future while it waits leaves the history
    /// untouched, since nothing is recorded until the caller is admitted.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let now = Instant::now();

                match window.try_admit(now, self.period) {
                    Admission::Granted { evicted } => {
                        if evicted {
                            debug!(
                                rate_limit = self.rate_limit,
                                "Evicted oldest admission to make room"
                            );
                        }
                        trace!(
                            recorded = window.len(),
                            rate_limit = self.rate_limit,
                            evicted = evicted,
                            "Admission granted"
                        );
                        return;
                    }
                    Admission::Full { wait } => wait,
                }
            };

            debug!(
                wait_ms = wait.as_millis() as u64,
                rate_limit = self.rate_limit,
                "Window full, waiting for the oldest admission to expire"
            );

            // Periods too long for an Instant deadline are clamped by tokio.
            sleep(wait).await;
        }
    }

    /// Leave the guarded block. Does nothing: admissions only stop counting
    /// once they age out of the window.
    pub fn release(&self) {}

    /// Wait for admission and return a guard that releases on drop.
    pub async fn acquire_guard(&self) -> ThrottleGuard<'_> {
        self.acquire().await;
        ThrottleGuard { limiter: self }
    }

    /// Run `work` inside an acquire/release bracket and return its output.
    pub async fn run<F>(&self, work: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.acquire_guard().await;
        work.await
    }

    /// Maximum admissions in any trailing window.
    pub fn rate_limit(&self) -> usize {
        self.rate_limit
    }

    /// Length of the trailing window.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of timestamps currently retained.
    pub fn recorded(&self) -> usize {
        self.window.lock().len()
    }

    /// Number of callers that would be admitted right now without waiting.
    pub fn available(&self) -> usize {
        let window = self.window.lock();
        self.rate_limit - window.in_window(Instant::now(), self.period)
    }

    /// How long until the next caller can be admitted. Zero only when
    /// [`available`](Self::available) is non-zero.
    pub fn time_until_available(&self) -> Duration {
        self.window
            .lock()
            .full_for(Instant::now(), self.period)
            .unwrap_or(Duration::ZERO)
    }
}

/// Scoped admission returned by [`SlidingWindowLimiter::acquire_guard`].
///
/// Calls [`SlidingWindowLimiter::release`] when dropped, however the guarded
/// block exits.
#[must_use = "dropping the guard immediately leaves the guarded block"]
#[derive(Debug)]
pub struct ThrottleGuard<'a> {
    limiter: &'a SlidingWindowLimiter,
}

impl Drop for ThrottleGuard<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
