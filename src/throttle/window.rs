//! Bounded history of admission timestamps.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// The caller was admitted and its timestamp recorded.
    Granted {
        /// Whether the oldest entry had to be evicted to make room
        evicted: bool,
    },
    /// The window is full until the oldest entry is strictly outside it,
    /// which is `wait` from the time of the check.
    Full { wait: Duration },
}

/// Upper bound on the history allocated up front; larger limits grow on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Admission timestamps, oldest first.
///
/// The deque never holds more than `capacity` entries. Deadlines are kept as
/// durations since an entry, so arbitrarily long periods never overflow an
/// `Instant`. Entries are only evicted when a new admission needs
/// the slot.
#[derive(Debug)]
pub(crate) struct Window {
    times: VecDeque<Instant>,
    capacity: usize,
}

impl Window {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(capacity.min(MAX_PREALLOCATED)),
            capacity,
        }
    }

    /// Try to record an admission at `now`.
    ///
    /// When the history is full, the oldest entry is evicted only if it lies
    /// strictly outside the trailing `period`; otherwise nothing changes.
    pub(crate) fn try_admit(&mut self, now: Instant, period: Duration) -> Admission {
        let mut evicted = false;

        if self.times.len() >= self.capacity {
            if let Some(&oldest) = self.times.front() {
                if let Some(wait) = remaining(oldest, now, period) {
                    return Admission::Full { wait };
                }
                self.times.pop_front();
                evicted = true;
            }
        }

        self.times.push_back(now);
        Admission::Granted { evicted }
    }

    /// Number of retained timestamps, including ones that have aged out.
    pub(crate) fn len(&self) -> usize {
        self.times.len()
    }

    /// Number of retained timestamps still inside the trailing `period`.
    pub(crate) fn in_window(&self, now: Instant, period: Duration) -> usize {
        // Oldest first, so everything after the first live entry is live too.
        let expired = self
            .times
            .iter()
            .take_while(|&&t| remaining(t, now, period).is_none())
            .count();
        self.times.len() - expired
    }

    /// How long until a new admission fits, if the history is full.
    pub(crate) fn full_for(&self, now: Instant, period: Duration) -> Option<Duration> {
        if self.times.len() < self.capacity {
            return None;
        }
        self.times
            .front()
            .and_then(|&oldest| remaining(oldest, now, period))
    }
}

/// Time until an entry recorded at `at` lies strictly outside the trailing
/// `period`, or `None` if it already does.
fn remaining(at: Instant, now: Instant, period: Duration) -> Option<Duration> {
    let age = now.saturating_duration_since(at);
    if age > period {
        return None;
    }
    Some((period - age).saturating_add(Duration::from_nanos(1)))
}
