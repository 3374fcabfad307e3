mod analysis;
mod collaborator;
mod config;
mod errors;
mod locks;
mod models;
mod normalize;
mod patch;
mod routes;
mod schema;
mod session;
mod state;
mod structure;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collaborator::{Collaborator, CollaboratorClient};
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume-core v{}", env!("CARGO_PKG_VERSION"));

    let collaborator: Option<Arc<dyn Collaborator>> = match &config.collaborator_url {
        Some(url) => {
            let client = CollaboratorClient::new(
                url.clone(),
                config.collaborator_retry,
                config.collaborator_timeout,
            )?;
            info!("Collaborator client initialized ({url})");
            Some(Arc::new(client))
        }
        None => {
            info!("COLLABORATOR_URL not set; fallback and suggest endpoints disabled");
            None
        }
    };

    if !config.default_locked_paths.is_empty() {
        info!("Default lock patterns: {:?}", config.default_locked_paths);
    }

    let state = AppState::new(config.clone(), collaborator);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
