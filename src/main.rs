use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use proephem::{Server, app, config::Config, store, telemetry};

/// Serves `getProEphemeris` over HTTP.
#[derive(Debug, Parser)]
#[command(name = "proephem", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    telemetry::init(&config.logging)
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing log subscriber")?;

    if config.auth.tokens.is_empty() {
        tracing::warn!("no auth tokens configured, every call will be rejected");
    }

    let router = Arc::new(
        app::build(&config, store::ensure_initialized()).context("configuring ephemeris engine")?,
    );
    let server = Server::bind(&config.server.address).await?;
    info!(
        address = %server.local_addr(),
        max_requests_per_day = config.rate_limit.max_requests_per_day,
        "starting proephem"
    );

    server
        .run_until(
            move |req| {
                let router = Arc::clone(&router);
                async move { router.route(req).await }
            },
            async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            },
        )
        .await?;

    info!("proephem stopped");
    Ok(())
}
