use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use mango_copy::backend::HttpBackend;
use mango_copy::config::Settings;
use mango_copy::routes::router;
use mango_copy::session::Workbench;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env();
    tracing::info!("Using copy backend at {} ({} / {})", settings.api_url, settings.llm_provider, settings.llm_model);

    let backend = HttpBackend::new(&settings).context("building backend client")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let sweep_every = (settings.session_ttl / 4).max(Duration::from_secs(1));
    let workbench = Workbench::new(Arc::new(backend), settings);
    workbench.spawn_sweeper(sweep_every);
    let app = router(workbench);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
