//! Identity provider contract.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use super::Identity;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("identity provider unavailable: {0}")]
    Provider(String),
}

/// Verifies a bearer token and returns the caller it belongs to.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Authenticator backed by a fixed token → uid table.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Adds one token, replacing any previous owner.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .map(Identity::new)
            .ok_or(AuthError::InvalidToken)
    }
}
