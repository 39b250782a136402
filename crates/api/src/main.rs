use anyhow::Context;

use releasehub_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    releasehub_observability::init(config.log_format);

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let app = releasehub_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;

    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires. If the signal cannot be installed the
/// server keeps running instead of shutting down right away.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to listen for ctrl-c; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
