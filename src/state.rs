use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide cooldown between upstream market fetches.
///
/// The last fetch instant lives in one atomic. A caller that sees the cooldown expired claims
/// the window with a compare-and-swap, so of several concurrent callers exactly one wins and
/// the rest are told to skip.
pub struct RefreshGate {
    cooldown: Duration,
    origin: Instant,
    /// Milliseconds since `origin` plus one; zero means no fetch yet.
    last_fetch: AtomicU64,
}

impl RefreshGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            origin: Instant::now(),
            last_fetch: AtomicU64::new(0),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Claim the current window. Returns `false` if the cooldown has not elapsed or another
    /// caller claimed it first.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Time left until the next fetch is allowed.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    fn stamp(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_millis() as u64 + 1
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let now_ms = self.stamp(now);
        let last = self.last_fetch.load(Ordering::Acquire);
        if last != 0 && now_ms.saturating_sub(last) < self.cooldown.as_millis() as u64 {
            return false;
        }
        self.last_fetch
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn remaining_at(&self, now: Instant) -> Duration {
        let last = self.last_fetch.load(Ordering::Acquire);
        if last == 0 {
            return Duration::ZERO;
        }
        let elapsed = Duration::from_millis(self.stamp(now).saturating_sub(last));
        self.cooldown.saturating_sub(elapsed)
    }
}
