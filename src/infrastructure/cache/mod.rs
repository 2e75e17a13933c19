//! Cache Module
//!
//! Redis connection management and the idempotency stores behind the
//! message send gate.
//!
//! ```text
//! +----------------------+
//! |  MessageService      |
//! +----------------------+
//!          |
//!          v
//! +----------------------+
//! |  IdempotencyStore    |  <-- Abstract interface
//! +----------------------+
//!      |            |
//!      v            v
//! +---------+  +---------+
//! |  Redis  |  | Memory  |
//! +---------+  +---------+
//! ```

mod idempotency;

pub use idempotency::{
    IdempotencyStore, MemoryIdempotencyStore, RedisIdempotencyStore, IDEMPOTENCY_KEY_PREFIX,
};

use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::{IdempotencyBackend, IdempotencySettings, RedisSettings};
use crate::shared::error::AppError;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Build the configured idempotency store.
///
/// The Redis backend needs a live connection; asking for it without one is
/// a configuration error.
pub fn create_idempotency_store(
    settings: &IdempotencySettings,
    redis: Option<ConnectionManager>,
) -> Result<Arc<dyn IdempotencyStore>, AppError> {
    let ttl = settings.ttl();
    match (settings.backend, redis) {
        (IdempotencyBackend::Redis, Some(conn)) => {
            info!(ttl_secs = ttl.as_secs(), "Using Redis idempotency store");
            Ok(Arc::new(RedisIdempotencyStore::new(conn, ttl)))
        }
        (IdempotencyBackend::Redis, None) => Err(AppError::Internal(
            "Redis idempotency backend configured without a Redis connection".into(),
        )),
        (IdempotencyBackend::Memory, _) => {
            info!(ttl_secs = ttl.as_secs(), "Using in-memory idempotency store");
            Ok(Arc::new(MemoryIdempotencyStore::new(ttl)))
        }
    }
}
