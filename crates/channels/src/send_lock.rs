//! Per-conversation send lock used for echo suppression.
//!
//! An outbound send and the echo the remote network broadcasts for it travel
//! through different code paths. Outbound handlers hold the lock for the
//! conversation while they send and record the resulting message ids;
//! inbound handlers [`SendLock::wait`] on the same key before running their
//! dedup check, so the check never runs before the ids are recorded.
//!
//! A hold expires after the configured timeout so a skipped release can
//! never wedge a conversation.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::{sync::Notify, time::Instant},
    tracing::{debug, warn},
};

/// Default time after which a held key is considered free again.
pub const DEFAULT_SEND_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
struct Hold {
    until: Instant,
    generation: u64,
}

/// Keyed mutual exclusion with a timeout per hold.
pub struct SendLock {
    timeout: Duration,
    held: Mutex<HashMap<String, Hold>>,
    released: Notify,
    generation: AtomicU64,
}

impl Default for SendLock {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_LOCK_TIMEOUT)
    }
}

impl SendLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            held: Mutex::new(HashMap::new()),
            released: Notify::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait until `key` is free (or its hold expired), then hold it.
    ///
    /// Dropping the returned guard releases this hold only; if the hold
    /// already expired and someone else acquired the key, the drop is a
    /// no-op.
    pub async fn acquire(&self, key: &str) -> SendLockGuard<'_> {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let held_until = {
                let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
                let now = Instant::now();
                match held.get(key).copied() {
                    Some(hold) if hold.until > now => hold.until,
                    stale => {
                        if stale.is_some() {
                            warn!(key, "send lock held past its timeout, forcing release");
                        }
                        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                        held.insert(key.to_string(), Hold {
                            until: now + self.timeout,
                            generation,
                        });
                        return SendLockGuard {
                            lock: self,
                            key: key.to_string(),
                            generation,
                        };
                    },
                }
            };

            debug!(key, "send lock busy, waiting");
            let _ = tokio::time::timeout_at(held_until, released).await;
        }
    }

    /// Wait until `key` is free or its hold expired, without holding it.
    pub async fn wait(&self, key: &str) {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let held_until = {
                let held = self.held.lock().unwrap_or_else(|e| e.into_inner());
                match held.get(key) {
                    Some(hold) if hold.until > Instant::now() => hold.until,
                    _ => return,
                }
            };

            let _ = tokio::time::timeout_at(held_until, released).await;
        }
    }

    /// Free `key` immediately. Releasing a free key is a no-op.
    pub fn release(&self, key: &str) {
        let removed = {
            let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            held.remove(key).is_some()
        };
        if removed {
            self.released.notify_waiters();
        }
    }

    /// Whether `key` is currently held by an unexpired hold.
    pub fn is_held(&self, key: &str) -> bool {
        let held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.get(key).is_some_and(|h| h.until > Instant::now())
    }

    fn release_generation(&self, key: &str, generation: u64) {
        let removed = {
            let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            if held.get(key).is_some_and(|h| h.generation == generation) {
                held.remove(key);
                true
            } else {
                false
            }
        };
        if removed {
            self.released.notify_waiters();
        }
    }
}

/// A hold on one key of a [`SendLock`].
#[must_use = "dropping the guard releases the send lock"]
pub struct SendLockGuard<'a> {
    lock: &'a SendLock,
    key: String,
    generation: u64,
}

impl Drop for SendLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_generation(&self.key, self.generation);
    }
}
