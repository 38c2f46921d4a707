//! The `getProEphemeris` request pipeline.
//!
//! 1. authenticate, 2. validate, 3. check quota, 4. read cache,
//! 5. compute on a miss, 6. populate the cache in the background, 7. respond.
//!
//! Quota store failures fail open and cache failures are invisible to the
//! caller; an exceeded quota always fails the request. The orchestrator keeps
//! no state between requests.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::background;
use crate::cache::{ResultCache, derive_key};
use crate::ephemeris::{EphemerisProvider, ProviderError};
use crate::rpc::{self, ProEphemerisResponse, RpcError};
use crate::security::{Identity, RateLimitError, RateLimiter};

pub mod endpoint;

/// Composes the collaborators that serve one request.
#[derive(Clone)]
pub struct Orchestrator {
    limiter: Arc<dyn RateLimiter>,
    cache: ResultCache,
    provider: Arc<dyn EphemerisProvider>,
}

impl Orchestrator {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        cache: ResultCache,
        provider: Arc<dyn EphemerisProvider>,
    ) -> Self {
        Self {
            limiter,
            cache,
            provider,
        }
    }

    /// Handles one call.
    ///
    /// `identity` is the authenticated caller, if any; `data` is the raw
    /// request payload.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] of kind `unauthenticated`, `invalid-argument`,
    /// `resource-exhausted` or `unavailable`. A provider failure that already
    /// carries a caller-visible kind is returned unchanged.
    pub async fn get_pro_ephemeris(
        &self,
        identity: Option<&Identity>,
        data: Value,
    ) -> Result<ProEphemerisResponse, RpcError> {
        let identity = identity.ok_or_else(|| RpcError::unauthenticated("Authentication required"))?;

        let request = rpc::validate(data)?;

        match self.limiter.check(identity).await {
            Ok(()) => {}
            Err(e @ RateLimitError::QuotaExceeded { .. }) => {
                info!(uid = %identity, "quota exhausted");
                return Err(RpcError::resource_exhausted(e.to_string()));
            }
            Err(RateLimitError::Store(e)) => {
                warn!(uid = %identity, error = %e, "rate limit check failed, continuing");
            }
        }

        let key = derive_key(
            &request.utc_iso,
            request.zodiac_system,
            &request.bodies,
            request.want_speed,
        );

        if let Some(extras) = self.cache.get(&key).await {
            if request.debug {
                info!(uid = %identity, %key, "cache hit");
            }
            return Ok(ProEphemerisResponse::new(extras, true));
        }

        if request.debug {
            info!(uid = %identity, %key, bodies = request.bodies.len(), "cache miss, computing");
        }

        let extras = self
            .provider
            .compute(
                request.instant,
                &request.bodies,
                request.zodiac_system,
                request.want_speed,
            )
            .await
            .map_err(|e| match e {
                ProviderError::Rejected(rpc) => rpc,
                other => {
                    warn!(uid = %identity, error = %other, "computation failed");
                    RpcError::unavailable(format!("Computation failed: {other}"))
                }
            })?;

        let cache = self.cache.clone();
        let stored = extras.clone();
        background::detach("cache write", async move { cache.set(&key, &stored).await });

        Ok(ProEphemerisResponse::new(extras, false))
    }
}
