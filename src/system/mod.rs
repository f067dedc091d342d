//! System-level routes: health and the PWA files

pub mod health_check;

use axum::{routing::get, Router};

use crate::pwa::{service_worker, web_manifest};
use crate::InnerState;

/// Creates system routes
#[tracing::instrument(name = "create_system_router", skip(state))]
pub fn create_system_router(state: InnerState) -> Router<InnerState> {
    tracing::info!("Creating system router");

    Router::new()
        .route("/health", get(health_check::health_check))
        .route("/sw.js", get(service_worker))
        .route("/manifest.json", get(web_manifest))
        .with_state(state)
}
