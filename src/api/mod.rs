//! HTTP API for the comparison page.

mod routes;
pub mod types;

use std::sync::Arc;

use crate::config::Config;
use crate::page::PageController;

pub use routes::{router, AppState};

/// Bind and serve until the process exits.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    if !config.credentials.is_complete() {
        tracing::warn!("API keys not configured; the page must supply them");
    }

    let state = Arc::new(AppState {
        controller: Arc::new(PageController::from_config(config)),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
