//! Authentication middleware.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{AuthError, Authenticator};
use crate::{
    context::Context,
    middleware::{BoxResponse, Middleware, Next},
};

/// Resolves `Authorization: Bearer <token>` into an [`Identity`](super::Identity).
///
/// On success the identity is inserted into the request extensions. Missing
/// or rejected credentials never short-circuit here: the request continues
/// without an identity and the handler decides how to answer, so its own
/// ordering of checks is preserved.
pub struct AuthMiddleware {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthMiddleware {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, mut ctx: Context, next: Next) -> BoxResponse {
        let authenticator = Arc::clone(&self.authenticator);

        Box::pin(async move {
            let token = ctx.request().bearer_token().map(str::to_owned);
            if let Some(token) = token {
                match authenticator.authenticate(&token).await {
                    Ok(identity) => {
                        debug!(uid = %identity, "caller authenticated");
                        ctx.extensions_mut().insert(identity);
                    }
                    Err(AuthError::Provider(reason)) => {
                        warn!(%reason, "identity provider failed");
                    }
                    Err(e) => debug!(error = %e, "credentials rejected"),
                }
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{MiddlewareHandler, from_middleware};
    use crate::security::{Identity, StaticTokenAuthenticator};
    use crate::{Request, Response, StatusCode};

    fn chain() -> Vec<MiddlewareHandler> {
        let auth = StaticTokenAuthenticator::default().with_token("good", "alice");
        let echo: MiddlewareHandler = Arc::new(|ctx: Context, _next: Next| -> BoxResponse {
            Box::pin(async move {
                match ctx.extensions().get::<Identity>() {
                    Some(id) => Response::new(StatusCode::Ok).body(id.uid().to_owned()),
                    None => Response::new(StatusCode::Unauthorized),
                }
            })
        });
        vec![
            from_middleware(Arc::new(AuthMiddleware::new(Arc::new(auth)))),
            echo,
        ]
    }

    async fn call(raw: &[u8]) -> Response {
        let (req, _) = Request::parse(raw).unwrap();
        Next::new(chain()).run(Context::new(req)).await
    }

    #[tokio::test]
    async fn valid_token_sets_identity() {
        let res = call(b"POST / HTTP/1.1\r\nAuthorization: Bearer good\r\n\r\n").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.content(), b"alice");
    }

    #[tokio::test]
    async fn bad_or_missing_token_passes_through_anonymous() {
        let res = call(b"POST / HTTP/1.1\r\nAuthorization: Bearer bad\r\n\r\n").await;
        assert_eq!(res.status(), StatusCode::Unauthorized);

        let res = call(b"POST / HTTP/1.1\r\n\r\n").await;
        assert_eq!(res.status(), StatusCode::Unauthorized);
    }
}
