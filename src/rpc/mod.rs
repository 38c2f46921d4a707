//! Wire contract of the `getProEphemeris` callable operation.
//!
//! Requests arrive as `{"data": {...}}` and succeed with `{"result": {...}}`.
//! Failures are reported as `{"error": {"status": "...", "message": "..."}}`
//! with one of a small, closed set of [`ErrorKind`]s.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ephemeris::Extras;
use crate::http::StatusCode;

pub mod validate;

pub use validate::{ProEphemerisRequest, ValidatedRequest, validate};

/// Fixed provider tag reported in every response.
pub const PROVIDER: &str = "swisseph";

/// Response schema version.
pub const VERSION: &str = "v1";

/// Caller-visible failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    InvalidArgument,
    ResourceExhausted,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// Lower-case code, e.g. `resource-exhausted`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument => "invalid-argument",
            Self::ResourceExhausted => "resource-exhausted",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }

    /// Canonical status name used in error bodies, e.g. `RESOURCE_EXHAUSTED`.
    pub fn status(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::Unauthorized,
            Self::InvalidArgument => StatusCode::BadRequest,
            Self::ResourceExhausted => StatusCode::TooManyRequests,
            Self::Unavailable => StatusCode::ServiceUnavailable,
            Self::Internal => StatusCode::InternalServerError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure that is reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceExhausted, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wire body for this error.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                status: self.kind.status().to_owned(),
                message: self.message.clone(),
            },
        }
    }
}

/// Response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub provider: String,
    pub cached: bool,
    pub version: String,
}

/// Successful result of the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProEphemerisResponse {
    pub extras: Extras,
    pub meta: ResponseMeta,
}

impl ProEphemerisResponse {
    pub fn new(extras: Extras, cached: bool) -> Self {
        Self {
            extras,
            meta: ResponseMeta {
                provider: PROVIDER.to_owned(),
                cached,
                version: VERSION.to_owned(),
            },
        }
    }
}

/// Inbound envelope: `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub data: Value,
}

/// Outbound success envelope: `{"result": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}
