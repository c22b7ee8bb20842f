use dotenvy::dotenv;
use invoice_web::config::get_configuration;
use invoice_web::services::{ConfiguredIssuer, NotionClient};
use invoice_web::startup::build_router;
use invoice_web::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::info;
use web_core::observability::{init_tracing, TracingOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Missing or malformed settings stop the process before anything binds.
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "invoice-web",
        TracingOptions {
            log_level: &configuration.telemetry.log_level,
            json: configuration.environment.is_production(),
            otlp_endpoint: configuration.telemetry.otlp_endpoint.as_deref(),
        },
    )?;

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    if configuration.issuer.is_none() {
        tracing::warn!("No issuer account configured; every login will be rejected");
    }

    let store = NotionClient::new(configuration.notion.clone())?;
    let authenticator = ConfiguredIssuer::new(configuration.issuer.clone());
    let address = configuration.address();
    let environment = configuration.environment;

    let state = AppState::new(Arc::new(configuration), Arc::new(store), Arc::new(authenticator))
        .with_metrics(metrics_handle);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(%environment, "Starting invoice-web on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
