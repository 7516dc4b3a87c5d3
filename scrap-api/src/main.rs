mod config;
mod error;
mod handlers;

use anyhow::Result;
use handlers::{router, AppState};
use scrap_core::{
    ai::CompletionClient,
    coin::CoinService,
    config::ScrapConfig,
    db::{create_pool, run_migrations, PgTokenRepository, TokenRepository},
    fetch::{Fetcher, HttpFetcher},
    jupiter::JupiterClient,
    swap::{RpcSubmitter, SwapService},
    wallet::WalletService,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = config::load_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = ScrapConfig::load(&args.config)?;
    tracing::info!("Loaded configuration for {}", settings.runtime.environment);

    let pool = create_pool(&settings.db.url, settings.db.max_connections).await?;
    run_migrations(&pool).await?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(settings.upstream.request_timeout())?);
    let tokens: Arc<dyn TokenRepository> = Arc::new(PgTokenRepository::new(pool.clone()));

    let wallets = Arc::new(WalletService::new(
        fetcher.clone(),
        settings.upstream.rpc_url.clone(),
        tokens.clone(),
    ));
    let coins = Arc::new(CoinService::new(
        fetcher.clone(),
        tokens.clone(),
        Arc::new(CompletionClient::new(fetcher.clone(), &settings.ai)),
        &settings.upstream,
    ));
    let swaps = Arc::new(SwapService::new(
        tokens.clone(),
        JupiterClient::new(
            fetcher.clone(),
            settings.upstream.jupiter_url.clone(),
            settings.swap.slippage_bps,
        ),
        wallets.clone(),
        Arc::new(RpcSubmitter::new(settings.upstream.rpc_url.clone())),
        settings.swap.submit_timeout(),
    ));

    let app = router(AppState {
        coins,
        swaps,
        wallets,
        tokens,
        settings: Arc::new(settings.coins.clone()),
    });

    let bind_addr = args.bind_addr.unwrap_or(settings.api.bind_addr);
    let addr: SocketAddr = bind_addr.parse()?;
    tracing::info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Database pool closed, bye");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e:?}");
        std::future::pending::<()>().await;
    }
}
