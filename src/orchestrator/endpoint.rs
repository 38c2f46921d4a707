//! HTTP binding of the callable operation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::Orchestrator;
use crate::context::Context;
use crate::middleware::LoggerMiddleware;
use crate::router::Router;
use crate::rpc::{CallRequest, CallResponse, RpcError};
use crate::security::{AuthMiddleware, Authenticator, Identity};
use crate::{Response, StatusCode};

/// Path of the callable operation.
pub const PATH: &str = "/getProEphemeris";

/// Liveness probe path.
pub const HEALTH_PATH: &str = "/healthz";

/// Serves one `POST /getProEphemeris` call.
pub async fn handle(orchestrator: &Orchestrator, ctx: Context) -> Response {
    let identity = ctx.extensions().get::<Identity>();

    let outcome = match ctx.json::<CallRequest>() {
        Ok(call) => orchestrator.get_pro_ephemeris(identity, call.data).await,
        Err(e) if identity.is_some() => Err(RpcError::invalid_argument(format!(
            "Invalid request: {e}"
        ))),
        Err(_) => Err(RpcError::unauthenticated("Authentication required")),
    };

    match outcome {
        Ok(result) => reply(StatusCode::Ok, &CallResponse { result }),
        Err(e) => failure(&e),
    }
}

fn failure(e: &RpcError) -> Response {
    Response::json(e.kind.http_status(), &e.to_envelope())
}

/// Encodes `body` as the response, or answers `internal` if it cannot be.
fn reply<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_value(body) {
        Ok(value) => Response::json(status, &value),
        Err(e) => {
            error!(error = %e, "failed to encode result");
            failure(&RpcError::internal("Failed to encode result"))
        }
    }
}

/// Builds the service router: access log, authentication, the callable
/// operation and a health probe.
pub fn router(orchestrator: Arc<Orchestrator>, authenticator: Arc<dyn Authenticator>) -> Router {
    let mut router = Router::new();
    router.layer(LoggerMiddleware);
    router.layer(AuthMiddleware::new(authenticator));

    router.get(HEALTH_PATH, |_ctx: Context| async {
        Response::json(StatusCode::Ok, &json!({ "status": "ok" }))
    });
    router.post(PATH, move |ctx: Context| {
        let orchestrator = Arc::clone(&orchestrator);
        async move { handle(&orchestrator, ctx).await }
    });

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use crate::cache::ResultCache;
    use crate::clock::SystemClock;
    use crate::ephemeris::{Body, EphemerisProvider, Extras, ProviderError, ZodiacSystem};
    use crate::security::{RateLimitError, RateLimiter};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::Value;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    struct Unlimited;

    #[async_trait]
    impl RateLimiter for Unlimited {
        async fn check(&self, _: &Identity) -> Result<(), RateLimitError> {
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl EphemerisProvider for Unreachable {
        async fn compute(
            &self,
            _: DateTime<Utc>,
            _: &[Body],
            _: ZodiacSystem,
            _: bool,
        ) -> Result<Extras, ProviderError> {
            Err(ProviderError::Computation("not expected".into()))
        }
    }

    fn orchestrator() -> Orchestrator {
        let cache = ResultCache::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        Orchestrator::new(Arc::new(Unlimited), cache, Arc::new(Unreachable))
    }

    fn context(body: &str, identity: Option<&str>) -> Context {
        let raw = format!(
            "POST {PATH} HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let (request, _) = Request::parse(raw.as_bytes()).unwrap();
        let mut ctx = Context::new(request);
        if let Some(uid) = identity {
            ctx.extensions_mut().insert(Identity::new(uid));
        }
        ctx
    }

    fn envelope(response: &Response) -> Value {
        serde_json::from_slice(response.content()).unwrap()
    }

    #[test]
    fn unencodable_result_is_internal() {
        let response = reply(StatusCode::Ok, &Unencodable);
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(
            envelope(&response),
            json!({ "error": { "status": "INTERNAL", "message": "Failed to encode result" } })
        );
    }

    #[tokio::test]
    async fn missing_envelope_checks_auth_first() {
        let anonymous = handle(&orchestrator(), context("{}", None)).await;
        assert_eq!(anonymous.status(), StatusCode::Unauthorized);
        assert_eq!(envelope(&anonymous)["error"]["status"], "UNAUTHENTICATED");

        let known = handle(&orchestrator(), context("{}", Some("alice"))).await;
        assert_eq!(known.status(), StatusCode::BadRequest);
        assert_eq!(envelope(&known)["error"]["status"], "INVALID_ARGUMENT");
    }
}
