//! JSON API consumed by the site's pages and the admin dashboard.

pub mod common;
pub mod v1;

use axum::Router;

use crate::InnerState;

/// Creates the `/api` router: public endpoints plus the guarded `/admin` block.
#[tracing::instrument(name = "create_api_router", skip(state))]
pub fn create_api_router(state: InnerState) -> Router<InnerState> {
    tracing::info!("Creating API router");

    Router::new()
        .merge(v1::routes::create_public_routes(state.clone()))
        .nest("/admin", v1::routes::create_admin_routes(state))
}
