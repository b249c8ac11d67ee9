mod api;
mod config;
mod dispatch;
mod error;
mod queue;

use config::ServerConfig;
use dispatch::{CollectionReaper, Dispatcher};
use queue::DispatchQueue;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = ServerConfig::from_env()?;

    let dispatcher = Arc::new(Dispatcher::new(DispatchQueue::new(), config.dispatch.clone()));

    // Spawn uncollected-task eviction
    let reaper = CollectionReaper::new(dispatcher.clone(), config.dispatch.reap_interval);
    tokio::spawn(async move {
        reaper.run().await;
    });

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Dispatch server listening");
    match config.dispatch.register_timeout {
        Some(deadline) => info!(?deadline, "Registrations expire"),
        None => info!("Registrations wait until assigned"),
    }

    axum::serve(listener, api::router(dispatcher)).await?;
    Ok(())
}
