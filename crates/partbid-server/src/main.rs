//! `PartBid` Server
//!
//! HTTP API for supplier auctions backed by an in-memory store.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use partbid_core::Marketplace;
use partbid_core::config::load_config;
use partbid_core::seed::load_demo_data;
use partbid_core::tracing_init::init_tracing;
use partbid_server::auth::JwtManager;
use partbid_server::http::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "partbid-server")]
#[command(version, about = "PartBid server - supplier auctions over a JSON API")]
struct Args {
    /// Settings file layered over the global one.
    #[arg(long, env = "PARTBID_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Populate an empty store with demo accounts and auctions.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    config.server.log_json |= args.log_json;
    config.market.seed_demo_data |= args.seed_demo;

    init_tracing(&config.server.log_level, config.server.log_json);

    let market = Marketplace::from_config(&config.market);
    if config.market.seed_demo_data {
        load_demo_data(&market).await?;
    }

    let jwt = JwtManager::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
    );
    let app = build_router(AppState::new(market, jwt));

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "PartBid server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("PartBid server stopped");
    Ok(())
}
