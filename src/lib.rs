//! # proephem
//!
//! An authenticated, rate-limited and cached service that returns geocentric
//! ecliptic positions for Chiron and the four major asteroids, served over a
//! small from-scratch HTTP/1.1 stack.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use proephem::{app, config::Config, store, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let router = Arc::new(app::build(&config, store::ensure_initialized())?);
//!
//!     let server = Server::bind(&config.server.address).await?;
//!     server
//!         .run(move |req| {
//!             let router = Arc::clone(&router);
//!             async move { router.route(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

// ── Transport ─────────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

// ── Service ──────────────────────────────────────────────────────────────────
pub mod angle;
pub mod background;
pub mod cache;
pub mod clock;
pub mod ephemeris;
pub mod orchestrator;
pub mod rpc;
pub mod security;
pub mod store;

// ── Process ──────────────────────────────────────────────────────────────────
pub mod app;
pub mod config;
pub mod telemetry;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use orchestrator::Orchestrator;
pub use rpc::{ErrorKind, RpcError};
pub use server::{Server, ServerError};
