use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::Cookie;

use crate::api::common::utils::AUTH_COOKIE;
use crate::api::v1::login::decode_token;
use crate::api::v1::settings::load_settings;
use crate::errors::AppError;
use crate::InnerState;

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/admin/login";
pub const COMING_SOON_PATH: &str = "/em-breve";

/// Validates the JWT carried by admin API requests and stores its claims in the
/// request extensions.
pub async fn auth_middleware(
    State(inner): State<InnerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)
        .ok_or_else(|| AppError::Authentication(anyhow::anyhow!("Missing token")))?;

    let claims = decode_token(&token, &inner.config)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Cookie-presence gate for admin pages. The token itself is not checked here;
/// the admin API validates it on every call.
pub async fn admin_page_guard(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let protected = path.starts_with(ADMIN_PREFIX) && !path.starts_with(LOGIN_PATH);

    if protected && auth_cookie(&request).is_none() {
        tracing::info!("No admin cookie for {}, redirecting to login", path);
        return Redirect::temporary(LOGIN_PATH).into_response();
    }

    next.run(request).await
}

/// Sends visitors to the "coming soon" page while maintenance mode is on.
pub async fn maintenance_guard(
    State(inner): State<InnerState>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() != COMING_SOON_PATH {
        match load_settings(&inner.db).await {
            Ok(settings) if settings.maintenance_mode => {
                return Redirect::temporary(COMING_SOON_PATH).into_response();
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to read maintenance flag: {}", e),
        }
    }

    next.run(request).await
}

fn auth_cookie<B>(req: &axum::http::Request<B>) -> Option<String> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == AUTH_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Extracts JWT from either the `Authorization` header or the auth cookie.
fn extract_token<B>(req: &axum::http::Request<B>) -> Option<String> {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    auth_cookie(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn guarded_app() -> Router {
        Router::new()
            .route("/admin/dashboard", get(|| async { "dashboard" }))
            .route("/admin/login", get(|| async { "login" }))
            .route("/videos", get(|| async { "videos" }))
            .layer(axum::middleware::from_fn(admin_page_guard))
    }

    async fn get_with_cookie(app: Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn admin_page_without_cookie_redirects_to_login() {
        let response = get_with_cookie(guarded_app(), "/admin/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn login_page_and_public_pages_are_open() {
        let login = get_with_cookie(guarded_app(), "/admin/login", None).await;
        assert_eq!(login.status(), StatusCode::OK);

        let videos = get_with_cookie(guarded_app(), "/videos", None).await;
        assert_eq!(videos.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn any_cookie_value_passes_the_page_guard() {
        let response = get_with_cookie(
            guarded_app(),
            "/admin/dashboard",
            Some("theme=dark; auth-token=not-even-a-jwt"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_cookie_value_is_treated_as_missing() {
        let response = get_with_cookie(guarded_app(), "/admin/dashboard", Some("auth-token=")).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .header(header::COOKIE, "auth-token=from-cookie")
            .body(())
            .unwrap();
        assert_eq!(extract_token(&request).as_deref(), Some("from-header"));
    }
}
