//! Request routing: map HTTP method and path to a handler.
//!
//! Paths match exactly, ignoring a trailing slash. A path that is registered
//! for other methods answers `405 Method Not Allowed` with an `Allow` header;
//! an unknown path answers `404 Not Found`. Every request, matched or not,
//! runs through the router's middleware layers in registration order.

use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{BoxResponse, Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler.
pub type Handler = Arc<dyn Fn(Context) -> BoxResponse + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> BoxResponse;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxResponse {
        Box::pin((self)(ctx))
    }
}

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

fn normalize_path(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

fn status_handler(response: fn() -> Response) -> Handler {
    Arc::new(move |_ctx: Context| -> BoxResponse { Box::pin(async move { response() }) })
}

/// HTTP request router with a middleware stack.
///
/// # Examples
///
/// ```rust,no_run
/// use proephem::router::Router;
/// use proephem::middleware::LoggerMiddleware;
/// use proephem::context::Context;
/// use proephem::{Response, StatusCode};
///
/// let mut router = Router::new();
/// router.layer(LoggerMiddleware);
/// router.get("/healthz", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    layers: Vec<MiddlewareHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `GET` requests to `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    /// Registers a handler for `POST` requests to `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, handler);
    }

    /// Appends a middleware layer; earlier layers wrap later ones.
    pub fn layer<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.layers.push(from_middleware(Arc::new(middleware)));
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx: Context| handler.call(ctx));
        self.routes.push(Route {
            method,
            path: normalize_path(path).to_owned(),
            handler,
        });
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn resolve(&self, method: &Method, path: &str) -> Handler {
        let path = normalize_path(path);
        let mut allowed: Vec<&str> = Vec::new();

        for route in self.routes.iter().filter(|r| r.path == path) {
            if &route.method == method {
                return Arc::clone(&route.handler);
            }
            allowed.push(route.method.as_str());
        }

        if allowed.is_empty() {
            return status_handler(|| Response::new(StatusCode::NotFound));
        }
        let allow = allowed.join(", ");
        Arc::new(move |_ctx: Context| -> BoxResponse {
            let allow = allow.clone();
            Box::pin(async move {
                Response::new(StatusCode::MethodNotAllowed).header("Allow", allow)
            })
        })
    }

    /// Runs `request` through the middleware layers and the matching handler.
    pub async fn route(&self, request: Request) -> Response {
        let handler = self.resolve(request.method(), request.path());

        let mut chain = self.layers.clone();
        chain.push(Arc::new(move |ctx: Context, _next: Next| handler(ctx)));

        Next::new(chain).run(Context::new(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/healthz/"), "/healthz");
        assert_eq!(normalize_path("/healthz"), "/healthz");
    }

    #[test]
    fn router_starts_empty() {
        let mut router = Router::new();
        assert!(router.is_empty());
        router.get("/a", |_ctx: Context| async { Response::new(StatusCode::Ok) });
        router.post("/b", |_ctx: Context| async { Response::new(StatusCode::Ok) });
        assert_eq!(router.len(), 2);
    }

    #[tokio::test]
    async fn empty_router_returns_404() {
        let router = Router::new();
        let res = router.route(make_request("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn matches_method_and_path() {
        let mut router = Router::new();
        router.post("/submit", |_ctx: Context| async { Response::new(StatusCode::NoContent) });
        let res = router.route(make_request("POST", "/submit/")).await;
        assert_eq!(res.status(), StatusCode::NoContent);
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let mut router = Router::new();
        router.post("/submit", |_ctx: Context| async { Response::new(StatusCode::Ok) });
        let res = router.route(make_request("GET", "/submit")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("POST"));
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let mut router = Router::new();
        router.get("/path", |_ctx: Context| async { Response::new(StatusCode::Ok) });
        router.get("/path", |_ctx: Context| async { Response::new(StatusCode::NoContent) });
        let res = router.route(make_request("GET", "/path")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    struct Tag;

    impl Middleware for Tag {
        fn handle(&self, ctx: Context, next: Next) -> BoxResponse {
            Box::pin(async move {
                let mut res = next.run(ctx).await;
                res.add_header("X-Tag", "1");
                res
            })
        }
    }

    #[tokio::test]
    async fn layers_wrap_matched_and_unmatched_requests() {
        let mut router = Router::new();
        router.layer(Tag);
        router.get("/a", |_ctx: Context| async { Response::new(StatusCode::Ok) });

        let hit = router.route(make_request("GET", "/a")).await;
        assert_eq!(hit.headers().get("x-tag"), Some("1"));

        let miss = router.route(make_request("GET", "/nope")).await;
        assert_eq!(miss.status(), StatusCode::NotFound);
        assert_eq!(miss.headers().get("x-tag"), Some("1"));
    }
}
