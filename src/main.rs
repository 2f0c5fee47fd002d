use anyhow::{anyhow, Context, Result};
use opsgenie_exporter::collector::SnapshotCollector;
use opsgenie_exporter::config::{AppConfig, LogConfig};
use opsgenie_exporter::descriptors::DescriptorSet;
use opsgenie_exporter::server::{create_router, AppState};
use opsgenie_exporter::source::OpsgenieClient;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("load configuration")?;
    init_tracing(&config.log).context("initialize tracing subscriber")?;

    if let Err(err) = run(config).await {
        tracing::error!(error = ?err, "fatal exporter error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let client = OpsgenieClient::new(&config.opsgenie).context("initialize opsgenie client")?;
    info!(endpoint = client.endpoint(), "opsgenie client initialized");

    let collector = SnapshotCollector::new(Arc::new(client), Arc::new(DescriptorSet::new()));
    let state = Arc::new(AppState::new(collector, config.http.path.clone()));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.http.addr)
        .await
        .with_context(|| format!("bind {}", config.http.addr))?;

    info!(addr = %config.http.addr, path = %config.http.path, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl_c listener error");
    }
    info!("shutdown signal received");
}

fn init_tracing(log: &LogConfig) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{},hyper=warn,reqwest=warn", log.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false);

    let result = if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
