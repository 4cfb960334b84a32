use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pizza_telemetry::config::TelemetryConfig;
use pizza_telemetry::export::HttpTransport;
use pizza_telemetry::metrics::MetricsCollector;
use pizza_telemetry::tasks::BackgroundTasks;
use pizza_telemetry::{server, AppState};

#[derive(Parser)]
#[command(name = "pizza-telemetry", about = "Pizza service telemetry pipeline")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    #[command(flatten)]
    telemetry: TelemetryConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pizza_telemetry=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(cli.telemetry);
    info!(?config, "metrics exporter configured");

    // ── 1. Shared collector ──────────────────────────────────────
    let metrics = Arc::new(MetricsCollector::new());

    // ── 2. Background loops ──────────────────────────────────────
    let transport = HttpTransport::new(config.request_timeout())?;
    let tasks = BackgroundTasks::spawn(Arc::clone(&metrics), Arc::clone(&config), transport);

    // ── 3. Router ────────────────────────────────────────────────
    let state = Arc::new(AppState { metrics });
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!(addr = %cli.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
