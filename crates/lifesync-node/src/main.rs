//! LifeSync node entry point.
//!
//! The node wires the full incident engine together: the record store
//! (in-memory or Dragonfly), the position source, the advisory service,
//! the session gate, and the HTTP/`WebSocket` gateway.
//!
//! # Architecture
//!
//! ```text
//! HTTP/WS clients --> Gateway --> Record Store --> change fan-out
//!                        |
//!                        +--> Advisory Service (decoupled, bounded)
//! ```
//!
//! A persisted responder session is restored at startup so the feed
//! fan-out task resumes without a fresh login.

mod config;
mod error;

use std::sync::Arc;

use lifesync_advisor::{AdvisorConfig, AdvisoryService};
use lifesync_core::{GeoLocator, HttpLocator, SessionStore};
use lifesync_gateway::{build_router, AppState};
use lifesync_store::RecordStore;
use lifesync_types::Role;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{GeoConfig, NodeConfig};
use crate::error::NodeError;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects the store, restores any persisted session, then serves the
/// gateway until `Ctrl-C`.
///
/// # Errors
///
/// Returns an error if initialization or serving fails.
#[tokio::main]
async fn main() -> Result<(), NodeError> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("lifesync-node starting");

    let config = NodeConfig::from_env()?;
    info!(
        bind_addr = config.bind_addr,
        session_file = %config.session_file.display(),
        "configuration loaded"
    );

    // Record store: Dragonfly when a URL is configured, memory otherwise.
    let store = match config.store_url.as_deref() {
        Some(url) => RecordStore::connect_dragonfly(url).await?,
        None => RecordStore::memory(),
    };
    info!(backend = store.backend_name(), "record store ready");

    // Position source.
    let locator = match config.geo.clone() {
        GeoConfig::Fixed(coordinate) => GeoLocator::fixed(coordinate)?,
        GeoConfig::Http { url, timeout } => GeoLocator::Http(HttpLocator::new(url, timeout)),
    };

    // Advisory service: online when a backend is configured, offline
    // fallback otherwise. A missing backend is not a startup failure.
    let advisor = match AdvisorConfig::from_env() {
        Ok(advisor_config) => {
            let service = AdvisoryService::new(&advisor_config);
            info!("advisory backend configured");
            service
        }
        Err(e) => {
            warn!(error = %e, "advisory backend unavailable, using offline fallback");
            AdvisoryService::offline()
        }
    };

    let session = SessionStore::new(config.session_file.clone());
    let restored = session.load();

    let state = Arc::new(AppState::new(store, locator, advisor, session));

    // A responder session persisted from a previous run resumes the
    // feed fan-out without a fresh login.
    if restored == Some(Role::Responder) {
        info!("restored responder session, starting feed");
        state.start_feed().await;
    }

    let router = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| NodeError::Bind(format!("bind failed on {}: {e}", config.bind_addr)))?;
    info!(addr = config.bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| NodeError::Serve(format!("serve error: {e}")))?;

    // Release the feed's store subscription before exit.
    state.stop_feed().await;
    info!("lifesync-node stopped");

    Ok(())
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }
}
