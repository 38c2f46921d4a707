//! Caller authentication and per-caller quotas.
//!
//! - [`Authenticator`]: identity provider contract, with a static
//!   bearer-token backend.
//! - [`AuthMiddleware`]: resolves the `Authorization` header into an
//!   [`Identity`] stored in the request [`Context`](crate::context::Context).
//! - [`RateLimiter`]: quota contract, with a daily fixed-window backend.

use std::fmt;

pub mod auth;
pub mod middleware;
pub mod rate_limit;

pub use auth::{AuthError, Authenticator, StaticTokenAuthenticator};
pub use middleware::AuthMiddleware;
pub use rate_limit::{DailyRateLimiter, RateLimitError, RateLimiter};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    uid: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}
