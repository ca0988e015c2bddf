//! Cross-instance mutual exclusion for the metrics refresh.
//!
//! Acquisition is atomic and fail-fast: the first acquirer wins and
//! everyone else gets `None` immediately — there is no blocking wait or
//! queue. Every claim carries a time-to-live so a crashed holder cannot
//! starve future refreshes. Release happens through the guard's `Drop`,
//! which guarantees it on all exit paths including failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Acquire-or-skip lock capability, scoped by a lock identifier.
pub trait RefreshLock: Send + Sync {
    /// Try to claim `lock_id` for at most `ttl`. `None` means another
    /// holder currently owns a live claim — a normal skip, not an error.
    fn acquire(&self, lock_id: &str, ttl: Duration) -> Option<LockGuard>;
}

/// Scoped claim on a refresh lock; releasing is dropping.
pub struct LockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[derive(Clone)]
struct Claim {
    lock_id: String,
    holder: Uuid,
    expires_at: Instant,
}

/// In-process lock backend standing at the external coordinator's
/// boundary. One claim at a time per lock identifier; an expired claim is
/// treated as free and may be taken over without waiting for the stale
/// guard to drop.
#[derive(Default)]
pub struct MemoryLock {
    claim: Arc<Mutex<Option<Claim>>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefreshLock for MemoryLock {
    fn acquire(&self, lock_id: &str, ttl: Duration) -> Option<LockGuard> {
        let holder = Uuid::new_v4();
        let now = Instant::now();

        {
            let mut claim = self.claim.lock();
            match claim.as_ref() {
                Some(existing) if existing.lock_id == lock_id && existing.expires_at > now => {
                    debug!(lock_id, "refresh lock already held");
                    return None;
                }
                _ => {}
            }
            *claim = Some(Claim {
                lock_id: lock_id.to_string(),
                holder,
                expires_at: now + ttl,
            });
        }

        // Fenced release: a guard outliving its TTL must not evict a
        // newer holder's claim.
        let state = Arc::clone(&self.claim);
        Some(LockGuard::new(move || {
            let mut claim = state.lock();
            if claim.as_ref().is_some_and(|c| c.holder == holder) {
                *claim = None;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK_ID: &str = "metrics-refresh";
    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn first_acquirer_wins_and_contention_fails_fast() {
        let lock = MemoryLock::new();
        let guard = lock.acquire(LOCK_ID, TTL);
        assert!(guard.is_some());
        assert!(lock.acquire(LOCK_ID, TTL).is_none());
    }

    #[test]
    fn dropping_the_guard_releases_the_claim() {
        let lock = MemoryLock::new();
        let guard = lock.acquire(LOCK_ID, TTL).unwrap();
        drop(guard);
        assert!(lock.acquire(LOCK_ID, TTL).is_some());
    }

    #[test]
    fn expired_claim_is_treated_as_free() {
        let lock = MemoryLock::new();
        let _stale = lock.acquire(LOCK_ID, Duration::from_millis(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(lock.acquire(LOCK_ID, TTL).is_some());
    }

    #[test]
    fn stale_guard_cannot_release_the_new_holder() {
        let lock = MemoryLock::new();
        let stale = lock.acquire(LOCK_ID, Duration::from_millis(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let _current = lock.acquire(LOCK_ID, TTL).unwrap();
        drop(stale);

        // The takeover's claim must still be live after the stale drop.
        assert!(lock.acquire(LOCK_ID, TTL).is_none());
    }
}
