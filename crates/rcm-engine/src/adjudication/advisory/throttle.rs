use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Minimum-interval gate shared by every advisory model call.
///
/// The lock is held only while deciding, never across the network call. A
/// throttled claim falls through to the next tier immediately.
#[derive(Debug)]
pub struct CallThrottle {
    min_interval: Duration,
    backoff: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl CallThrottle {
    pub fn new(min_interval: Duration, backoff: Duration) -> Self {
        Self {
            min_interval,
            backoff,
            next_allowed: Mutex::new(None),
        }
    }

    /// Claim the right to call out now. Returns `false` while the window is closed.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut next_allowed = self.lock();
        match *next_allowed {
            Some(at) if now < at => false,
            _ => {
                *next_allowed = Some(now + self.min_interval);
                true
            }
        }
    }

    /// Push the window out after the remote side reported a quota problem.
    pub fn back_off(&self) {
        let until = Instant::now() + self.backoff;
        let mut next_allowed = self.lock();
        if next_allowed.map_or(true, |at| at < until) {
            *next_allowed = Some(until);
        }
    }

    /// Time left before another call may be attempted.
    pub fn remaining(&self) -> Duration {
        let next_allowed = self.lock();
        next_allowed
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
