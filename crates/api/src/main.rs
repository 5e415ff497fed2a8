use std::env;

use anyhow::{Context, Result};
use pawtrip_api::build_app;
use pawtrip_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("pawtrip_api");

    let bind = env::var("PAWTRIP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let app = build_app().context("failed to build pawtrip api")?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind = %bind, "pawtrip api started");

    axum::serve(listener, app).await?;
    Ok(())
}
