//! Nonce manager with monotonic guarantees.
//!
//! Every signed action carries a nonce. The exchange rejects a nonce it
//! has already seen for the signer, so nonces issued by one session must
//! be unique and strictly increasing, and should stay close to wall time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Shared clock handle stored by a session.
pub type SharedClock = Arc<dyn Clock>;

/// Issues `max(last + 1, now_ms)` through a CAS loop.
///
/// The counter is seeded from the clock at construction, so the first
/// nonce is never below the session's start time.
pub struct NonceManager<C: Clock> {
    counter: AtomicU64,
    clock: C,
}

impl<C: Clock> NonceManager<C> {
    #[must_use]
    pub fn new(clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            counter: AtomicU64::new(now),
            clock,
        }
    }

    /// Next nonce. Thread-safe and lock-free.
    pub fn next(&self) -> u64 {
        let target = self.clock.now_ms();

        loop {
            let current = self.counter.load(Ordering::Acquire);
            let next_val = current.saturating_add(1).max(target);

            match self.counter.compare_exchange_weak(
                current,
                next_val,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_val,
                Err(_) => continue,
            }
        }
    }

    /// Last nonce handed out (or the seed if none yet).
    #[must_use]
    pub fn last(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Clock whose time is set by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(initial_ms: u64) -> Self {
        Self {
            time_ms: AtomicU64::new(initial_ms),
        }
    }

    pub fn set(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::Release);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.time_ms.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::Acquire)
    }
}
