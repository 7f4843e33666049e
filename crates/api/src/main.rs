use std::sync::Arc;

use anyhow::Context;

use exportdesk_api::app::{build_app, AppServices};
use exportdesk_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    exportdesk_observability::init(config.log_format);

    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let services = Arc::new(AppServices::from_config(&config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
