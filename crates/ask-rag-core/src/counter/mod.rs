//! Expiring counter store abstraction used by the rate limiter.
//!
//! A [`CounterStore`] is an atomic increment-with-expiry service. The three
//! primitive operations mirror a key-value cache (`GET`, `SETEX`, `INCR`);
//! [`consume`](CounterStore::consume) is the single indivisible
//! check-and-increment the rate limiter relies on.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::{Clock, InMemoryCounterStore, ManualClock, SystemClock};

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Short backend label used in logs (e.g. `"memory"`, `"sqlite"`).
    fn backend_name(&self) -> &str;

    /// Current value of `key`, or `None` if absent or expired.
    async fn get_if_present(&self, key: &str) -> Result<Option<u64>>;

    /// Set `key` to `value`, expiring `ttl_secs` from now.
    async fn set_with_expiry(&self, key: &str, value: u64, ttl_secs: u64) -> Result<()>;

    /// Increment `key` by one, keeping its expiry. An absent key starts at 1
    /// with no expiry. Returns the new value.
    async fn increment(&self, key: &str) -> Result<u64>;

    /// Atomically consume one unit of a fixed window.
    ///
    /// - absent or expired key: set to 1, expiring `ttl_secs` from now
    /// - live key below `limit`: increment, keeping the original expiry
    /// - live key at or above `limit`: leave untouched
    ///
    /// Returns the new count, or `None` when the window is exhausted.
    async fn consume(&self, key: &str, limit: u64, ttl_secs: u64) -> Result<Option<u64>>;
}
