use anyhow::Context;
use kakeibo_server::{AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting = BunyanFormattingLayer::new(env!("CARGO_PKG_NAME").into(), std::io::stdout);
    tracing_subscriber::registry()
        .with(filter)
        .with(JsonStorageLayer)
        .with(formatting)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::load().context("Failed to load configuration")?;
    let state = AppState::from_config(&config);
    info!(
        data_file = %config.data_file.display(),
        ocr_available = state.pipeline.is_ocr_available(),
        "Ledger service configured"
    );

    let app = kakeibo_server::router(state, &config);
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
