//! Result cache: TTL-bounded storage of computed positions.
//!
//! Entries live in the [`KvStore`] collection [`COLLECTION`] under their
//! [`Fingerprint`]. Expiry is checked on read; stale entries are removed
//! lazily and best-effort, and in bulk by [`ResultCache::purge_expired`]. Writers for the same fingerprint simply overwrite
//! each other since the stored values are deterministic.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::ephemeris::Extras;
use crate::store::{KvStore, StoreError};

pub mod key;

pub use key::{Fingerprint, derive_key};

/// Store collection holding cache entries.
pub const COLLECTION: &str = "proEphemerisCache";

/// Days an entry stays fresh.
pub const TTL_DAYS: i64 = 3;

/// Time-to-live of a cache entry.
pub fn ttl() -> TimeDelta {
    TimeDelta::days(TTL_DAYS)
}

/// Persisted form of a cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub extras: Extras,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read-through cache of [`Extras`] keyed by request fingerprint.
///
/// Cheap to clone; clones share the same store and clock.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the cached result for `key` if a fresh entry exists.
    ///
    /// Store failures and undecodable entries are logged and reported as a
    /// miss. An expired entry is deleted on the way out; a failed delete is
    /// ignored.
    pub async fn get(&self, key: &Fingerprint) -> Option<Extras> {
        let document = match self.store.get(COLLECTION, key.as_str()).await {
            Ok(Some(document)) => document,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_value(document) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "discarding undecodable cache entry");
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!(key = %key, expired_at = %entry.expires_at, "cache entry expired");
            if let Err(e) = self.store.delete(COLLECTION, key.as_str()).await {
                debug!(key = %key, error = %e, "failed to delete expired cache entry");
            }
            return None;
        }

        Some(entry.extras)
    }

    /// Stores `extras` under `key`, fresh for [`ttl`] from now.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the entry cannot be encoded or written.
    pub async fn set(&self, key: &Fingerprint, extras: &Extras) -> Result<(), CacheError> {
        let now = self.clock.now();
        let entry = CacheEntry {
            extras: extras.clone(),
            created_at: now,
            expires_at: now + ttl(),
        };
        let document = serde_json::to_value(&entry)?;
        self.store.put(COLLECTION, key.as_str(), document).await?;
        debug!(key = %key, expires_at = %entry.expires_at, "cache entry written");
        Ok(())
    }

    /// Deletes every expired or undecodable entry and returns how many went.
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        self.store
            .retain(COLLECTION, &|_, document| {
                serde_json::from_value::<CacheEntry>(document.clone())
                    .is_ok_and(|entry| !entry.is_expired(now))
            })
            .await
    }
}
