use std::sync::Arc;

use anyhow::Context;
use ledgergate_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledgergate_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let services = Arc::new(ledgergate_api::app::services::build_services(&settings).await?);
    let app = ledgergate_api::app::build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(settings.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested; draining in-flight requests");
}
