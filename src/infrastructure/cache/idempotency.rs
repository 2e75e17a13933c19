//! Idempotency Store
//!
//! Atomic "has this submission been seen?" records with a TTL, used by the
//! message send gate. Redis backs it in deployments; an in-process map
//! serves tests and single-node development.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

use crate::shared::error::AppError;

/// Key prefix for idempotency records.
pub const IDEMPOTENCY_KEY_PREFIX: &str = "idempotency:";

/// Number of records after which the memory store sweeps expired entries.
const MEMORY_SWEEP_THRESHOLD: usize = 10_000;

/// Minimum time between two sweeps of the memory store.
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Atomic check-and-set over idempotency records.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Record `key` unless a live record exists.
    ///
    /// # Returns
    /// * `Ok(true)` - The key was already recorded (duplicate)
    /// * `Ok(false)` - The key was new and is now recorded
    /// * `Err(AppError)` - The store could not answer
    async fn check_and_set(&self, key: &str) -> Result<bool, AppError>;

    /// Forget `key` so a later submission with it is admitted again.
    async fn release(&self, key: &str) -> Result<(), AppError>;

    /// Lifetime of a record.
    fn ttl(&self) -> Duration;
}

fn full_key(key: &str) -> String {
    format!("{IDEMPOTENCY_KEY_PREFIX}{key}")
}

/// Redis-backed store using `SET key 1 NX EX ttl`.
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisIdempotencyStore {
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    #[instrument(skip(self), level = "debug")]
    async fn check_and_set(&self, key: &str) -> Result<bool, AppError> {
        let full_key = full_key(key);
        let mut conn = self.conn.clone();
        let seconds = self.ttl.as_secs().max(1);

        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;

        let duplicate = result.is_none();
        debug!(key = %full_key, ttl = seconds, duplicate, "Idempotency check");

        Ok(duplicate)
    }

    #[instrument(skip(self), level = "debug")]
    async fn release(&self, key: &str) -> Result<(), AppError> {
        let full_key = full_key(key);
        let mut conn = self.conn.clone();

        let deleted: i64 = redis::cmd("DEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;
        debug!(key = %full_key, deleted, "Idempotency record released");

        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Process-local store. Records expire lazily on access; once the map is
/// large, expired records are swept at most once per sweep interval.
pub struct MemoryIdempotencyStore {
    entries: DashMap<String, Instant>,
    ttl: Duration,
    sweep_threshold: usize,
    sweep_interval: Duration,
    last_sweep: Mutex<Instant>,
}

impl MemoryIdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep(ttl, MEMORY_SWEEP_THRESHOLD, MEMORY_SWEEP_INTERVAL)
    }

    pub fn with_sweep(ttl: Duration, sweep_threshold: usize, sweep_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_threshold,
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    fn maybe_sweep(&self) {
        if self.entries.len() < self.sweep_threshold {
            return;
        }
        // Another caller is already sweeping.
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if last_sweep.elapsed() < self.sweep_interval {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);

        let before = self.entries.len();
        self.purge_expired();
        debug!(before, after = self.entries.len(), "Swept idempotency records");
    }

    /// Drop every expired record.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, expires_at| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn check_and_set(&self, key: &str) -> Result<bool, AppError> {
        self.maybe_sweep();

        let now = Instant::now();
        let expires_at = now + self.ttl;

        let duplicate = match self.entries.entry(full_key(key)) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    true
                } else {
                    entry.insert(expires_at);
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                false
            }
        };

        debug!(key, duplicate, "Idempotency check (memory)");
        Ok(duplicate)
    }

    async fn release(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(&full_key(key));
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
