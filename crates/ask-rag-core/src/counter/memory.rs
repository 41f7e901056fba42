//! In-memory [`CounterStore`] with an injectable clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::CounterStore;

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Counter store held in process memory.
///
/// All operations take one mutex for their whole read-modify-write, which
/// is what makes [`consume`](CounterStore::consume) atomic.
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get_if_present(&self, key: &str) -> Result<Option<u64>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let live = entries.get(key).filter(|e| e.is_live(now)).map(|e| e.value);
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set_with_expiry(&self, key: &str, value: u64, ttl_secs: u64) -> Result<()> {
        let expires_at = self.clock.now() + Duration::from_secs(ttl_secs);
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: 0,
            expires_at: None,
        });
        if !entry.is_live(now) {
            *entry = Entry {
                value: 0,
                expires_at: None,
            };
        }
        entry.value += 1;
        Ok(entry.value)
    }

    async fn consume(&self, key: &str, limit: u64, ttl_secs: u64) -> Result<Option<u64>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        if let Some(e) = entries.get_mut(key) {
            if e.is_live(now) {
                if e.value >= limit {
                    return Ok(None);
                }
                e.value += 1;
                return Ok(Some(e.value));
            }
        }
        if limit == 0 {
            return Ok(None);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: 1,
                expires_at: Some(now + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(Some(1))
    }
}
