//! Server-rendered HTML pages.

pub mod admin;
pub mod layout;
pub mod public;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::common::middleware::{admin_page_guard, maintenance_guard};
use crate::InnerState;

#[tracing::instrument(name = "create_pages_router", skip(state))]
pub fn create_pages_router(state: InnerState) -> Router<InnerState> {
    tracing::info!("Creating pages router");

    let public = Router::new()
        .route("/", get(public::home))
        .route("/sobre", get(public::about))
        .route("/contacto", get(public::contact))
        .route("/videos", get(public::videos))
        .route("/em-breve", get(public::coming_soon))
        .layer(middleware::from_fn_with_state(state.clone(), maintenance_guard));

    let admin = Router::new()
        .route("/admin/login", get(admin::login_page).post(admin::login_submit))
        .route("/admin/logout", post(admin::logout_submit))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/videos", get(admin::videos))
        .layer(middleware::from_fn(admin_page_guard));

    Router::new().merge(public).merge(admin).with_state(state)
}
