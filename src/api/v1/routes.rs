//! V1 API route definitions
//!
//! Public endpoints are open; everything under `/admin` goes through the JWT
//! middleware.

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::api::common::middleware::auth_middleware;
use crate::api::v1::analytics::get_analytics;
use crate::api::v1::categories::{
    admin_list_categories, create_category, edit_category, list_category_options, remove_category,
};
use crate::api::v1::contact::{admin_list_contact_messages, submit_contact, subscribe_newsletter};
use crate::api::v1::login::{login_user, logout_user};
use crate::api::v1::player::{close_player_session, register_player, report_player_state};
use crate::api::v1::settings::{get_settings, update_settings};
use crate::api::v1::videos::{
    admin_list_videos, create_video, edit_video, get_video, list_video_categories, list_videos,
    patch_video_active, patch_video_featured, remove_video,
};
use crate::InnerState;

#[tracing::instrument(name = "create_public_routes", skip(state))]
pub fn create_public_routes(state: InnerState) -> Router<InnerState> {
    tracing::info!("Setting up public API routes");

    Router::new()
        // Video catalogue
        .route("/videos", get(list_videos))
        .route("/videos/categories", get(list_video_categories))
        .route("/videos/{id}", get(get_video))
        .route("/categories", get(list_category_options))
        .route("/settings", get(get_settings))

        // Visitor forms
        .route("/contact", post(submit_contact))
        .route("/newsletter", post(subscribe_newsletter))

        // Player coordination
        .route("/player/sessions/{session}", delete(close_player_session))
        .route("/player/sessions/{session}/players", post(register_player))
        .route(
            "/player/sessions/{session}/players/{container}/state",
            post(report_player_state),
        )

        // Authentication
        .route("/auth/login", post(login_user))
        .route("/auth/logout", post(logout_user))
        .with_state(state)
}

#[tracing::instrument(name = "create_admin_routes", skip(state))]
pub fn create_admin_routes(state: InnerState) -> Router<InnerState> {
    tracing::info!("Setting up admin API routes");

    Router::new()
        // Video management
        .route("/videos", get(admin_list_videos).post(create_video))
        .route("/videos/{id}", put(edit_video).delete(remove_video))
        .route("/videos/{id}/active", patch(patch_video_active))
        .route("/videos/{id}/featured", patch(patch_video_featured))

        // Category management
        .route("/categories", get(admin_list_categories).post(create_category))
        .route("/categories/{id}", put(edit_category).delete(remove_category))

        .route("/settings", put(update_settings))
        .route("/analytics", get(get_analytics))
        .route("/contact-messages", get(admin_list_contact_messages))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
