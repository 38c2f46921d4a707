//! Wires configuration into a ready-to-serve [`Router`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::background;
use crate::cache::ResultCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::ephemeris::{EphemerisProvider, ProviderError, SwissEphemerisProvider};
use crate::orchestrator::{Orchestrator, endpoint};
use crate::router::Router;
use crate::security::{Authenticator, DailyRateLimiter, StaticTokenAuthenticator};
use crate::store::{KvStore, StoreError};

/// Builds the service against `store` with the Swiss Ephemeris provider.
///
/// Must be called within a Tokio runtime; see [`build_with_provider`].
///
/// # Errors
///
/// Fails if the configured ephemeris path cannot be handed to the engine.
pub fn build(config: &Config, store: Arc<dyn KvStore>) -> Result<Router, ProviderError> {
    let provider = SwissEphemerisProvider::new(&config.ephemeris.path)?;
    info!(path = %provider.ephe_path().display(), "using Swiss Ephemeris data files");
    Ok(build_with_provider(config, store, Arc::new(provider)))
}

/// Builds the service and starts the periodic sweep of expired cache
/// entries and stale quota counters.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn build_with_provider(
    config: &Config,
    store: Arc<dyn KvStore>,
    provider: Arc<dyn EphemerisProvider>,
) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let limiter = Arc::new(DailyRateLimiter::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.rate_limit.max_requests_per_day,
    ));
    let cache = ResultCache::new(store, clock);
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(StaticTokenAuthenticator::new(config.auth.tokens.clone()));

    let sweep_cache = cache.clone();
    let sweep_limiter = Arc::clone(&limiter);
    background::every(
        "store sweep",
        Duration::from_secs(config.store.sweep_interval_secs),
        move || {
            let cache = sweep_cache.clone();
            let limiter = Arc::clone(&sweep_limiter);
            async move { sweep(&cache, &limiter).await }
        },
    );

    let orchestrator = Arc::new(Orchestrator::new(limiter, cache, provider));
    endpoint::router(orchestrator, authenticator)
}

/// Deletes expired cache entries and counters of past quota windows.
pub async fn sweep(cache: &ResultCache, limiter: &DailyRateLimiter) -> Result<(), StoreError> {
    let entries = cache.purge_expired().await?;
    let counters = limiter.purge_stale().await?;
    if entries + counters > 0 {
        info!(entries, counters, "swept expired documents");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;
    use crate::clock::ManualClock;
    use crate::ephemeris::{Body, BodyPosition, Extras, ZodiacSystem};
    use crate::security::{Identity, RateLimiter};
    use crate::store::MemoryStore;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[tokio::test]
    async fn sweep_empties_a_stale_store() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap(),
        ));
        let cache = ResultCache::new(store.clone(), clock.clone());
        let limiter = DailyRateLimiter::new(store.clone(), clock.clone(), 10);

        let mut extras = Extras::new();
        extras.insert(Body::Juno, BodyPosition::new(1.0, None));
        let key = derive_key("2025-05-01T00:00:00Z", ZodiacSystem::Tropical, &[Body::Juno], false);
        cache.set(&key, &extras).await.unwrap();
        limiter.check(&Identity::new("alice")).await.unwrap();
        assert_eq!(store.len(), 2);

        sweep(&cache, &limiter).await.unwrap();
        assert_eq!(store.len(), 2);

        clock.advance(TimeDelta::days(3));
        sweep(&cache, &limiter).await.unwrap();
        assert!(store.is_empty());
    }
}
