//! Per-caller request quotas.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::Identity;
use crate::clock::Clock;
use crate::store::{KvStore, StoreError};

/// Store collection holding quota counters.
pub const COLLECTION: &str = "proEphemerisRateLimits";

/// Default daily allowance per caller.
pub const DEFAULT_MAX_REQUESTS_PER_DAY: u64 = 100;

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The caller has used up its allowance.
    #[error("Rate limit exceeded: {limit} requests per day")]
    QuotaExceeded { limit: u64 },

    /// The quota could not be checked at all.
    #[error("quota store failure: {0}")]
    Store(#[from] StoreError),
}

/// Tracks and enforces per-caller quotas.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records one request for `identity` and checks it against the quota.
    async fn check(&self, identity: &Identity) -> Result<(), RateLimitError>;
}

/// Fixed-window limiter: at most `max_per_day` requests per UTC calendar day.
pub struct DailyRateLimiter {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    max_per_day: u64,
}

impl DailyRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, max_per_day: u64) -> Self {
        Self {
            store,
            clock,
            max_per_day,
        }
    }

    fn today(&self) -> String {
        self.clock.now().format("%Y-%m-%d").to_string()
    }

    fn window_key(&self, identity: &Identity) -> String {
        format!("{}:{}", identity.uid(), self.today())
    }

    /// Deletes the counters of every window before today.
    pub async fn purge_stale(&self) -> Result<usize, StoreError> {
        let today = self.today();
        self.store
            .retain(COLLECTION, &|key, _| {
                key.rsplit_once(':').is_some_and(|(_, day)| day == today)
            })
            .await
    }

    /// Drops `identity`'s counters from earlier windows.
    async fn close_previous_windows(&self, identity: &Identity, current: &str) {
        let prefix = format!("{}:", identity.uid());
        let result = self
            .store
            .retain(COLLECTION, &|key, _| {
                // Another uid may extend this one past a colon.
                key == current
                    || key
                        .strip_prefix(&prefix)
                        .is_none_or(|rest| rest.contains(':'))
            })
            .await;
        match result {
            Ok(0) => {}
            Ok(removed) => debug!(uid = %identity, removed, "dropped earlier quota windows"),
            Err(e) => debug!(uid = %identity, error = %e, "failed to drop earlier quota windows"),
        }
    }
}

#[async_trait]
impl RateLimiter for DailyRateLimiter {
    async fn check(&self, identity: &Identity) -> Result<(), RateLimitError> {
        let key = self.window_key(identity);
        let used = self.store.increment(COLLECTION, &key).await?;
        debug!(uid = %identity, used, limit = self.max_per_day, "quota checked");

        if used == 1 {
            self.close_previous_windows(identity, &key).await;
        }

        if used > self.max_per_day {
            return Err(RateLimitError::QuotaExceeded {
                limit: self.max_per_day,
            });
        }
        Ok(())
    }
}
