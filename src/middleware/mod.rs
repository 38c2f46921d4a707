//! Middleware pipeline: composable before/after request handler logic.
//!
//! Each middleware wraps the next layer and may pass through, short-circuit
//! with its own [`Response`], or decorate the downstream response. The
//! [`Router`](crate::router::Router) appends the matched route handler as the
//! innermost layer.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;
use tracing::info;

use crate::{Response, StatusCode, context::Context};

/// Boxed future returned by middleware and handlers.
pub type BoxResponse = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> BoxResponse + Send + Sync + 'static>;

/// Cursor into the remaining middleware chain for one request.
///
/// `Next` is consumed by [`run`](Self::run), so each layer can forward at
/// most once.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    index: usize,
}

impl Next {
    /// Positions a cursor at the start of `middlewares`.
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next layer.
    ///
    /// An exhausted chain yields `500 Internal Server Error`.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = self.middlewares[self.index].clone();
            self.index += 1;
            handler(ctx, self).await
        } else {
            Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// The core trait for all middleware.
///
/// Implementations are shared across Tokio tasks and must not hold `&mut`
/// references to shared state across an `.await` point.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse;
}

/// Access log: one `info` event per request with method, path, status and latency.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            info!(
                %method,
                %path,
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request handled"
            );
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;

    fn ctx() -> Context {
        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        Context::new(req)
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn handle(&self, _ctx: Context, _next: Next) -> BoxResponse {
            Box::pin(async { Response::new(StatusCode::Unauthorized) })
        }
    }

    #[tokio::test]
    async fn empty_chain_is_500() {
        let res = Next::new(vec![]).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn layers_run_in_order() {
        let terminal: MiddlewareHandler = Arc::new(|_ctx: Context, _next: Next| -> BoxResponse {
            Box::pin(async { Response::new(StatusCode::Ok) })
        });
        let chain = vec![from_middleware(Arc::new(LoggerMiddleware)), terminal.clone()];
        assert_eq!(Next::new(chain).run(ctx()).await.status(), StatusCode::Ok);

        let chain = vec![from_middleware(Arc::new(ShortCircuit)), terminal];
        assert_eq!(
            Next::new(chain).run(ctx()).await.status(),
            StatusCode::Unauthorized
        );
    }
}
