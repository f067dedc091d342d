mod api;
mod authentication;
mod config;
mod db;
mod embed;
mod errors;
mod pages;
mod player;
mod pwa;
mod system;

use std::error::Error;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use sqlx::SqlitePool;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::common::tracing::{
    make_custom_span, on_custom_failure, on_custom_request, on_custom_response,
};
use crate::authentication::ensure_admin_user;
use crate::config::Config;
use crate::db::init_db;
use crate::player::PlayerHub;

#[derive(Clone)]
pub struct InnerState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub players: PlayerHub,
}

/// Every route of the site except `/metrics`.
pub fn build_app(state: InnerState) -> Router {
    Router::new()
        .merge(system::create_system_router(state.clone()))
        .merge(pages::create_pages_router(state.clone()))
        .nest("/api", api::create_api_router(state.clone()))
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_custom_span)
                .on_request(on_custom_request)
                .on_response(on_custom_response)
                .on_failure(on_custom_failure),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mundo_musical=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = init_db(&config.database_url, config.db_max_connections).await?;

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => ensure_admin_user(&db, email, password.clone()).await?,
        _ => tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded"),
    }

    let address = config.bind_address()?;
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let state = InnerState {
        db,
        config: Arc::new(config),
        players: PlayerHub::new(),
    };

    let app = build_app(state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::api::v1::login::generate_token;
    use crate::db::test_pool;
    use secrecy::Secret;

    pub const ADMIN_EMAIL: &str = "admin@mundomusical.com";
    pub const ADMIN_PASSWORD: &str = "dino-rocks";

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "SECRET_TOKEN" => Some("test-secret".to_string()),
            "ENVIRONMENT" => Some("development".to_string()),
            _ => None,
        })
        .expect("test configuration must parse")
    }

    pub async fn test_state() -> InnerState {
        InnerState {
            db: test_pool().await,
            config: Arc::new(test_config()),
            players: PlayerHub::new(),
        }
    }

    pub async fn seed_admin(state: &InnerState) {
        ensure_admin_user(&state.db, ADMIN_EMAIL, Secret::new(ADMIN_PASSWORD.to_string()))
            .await
            .expect("Failed to seed admin");
    }

    /// Cookie header value carrying a valid admin token.
    pub fn admin_cookie(state: &InnerState) -> String {
        let token = generate_token(ADMIN_EMAIL, "admin-1", &state.config).unwrap();
        format!("auth-token={}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, Response, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_pages_redirect_to_login_without_cookie() {
        let app = build_app(test_state().await);

        for path in ["/admin/dashboard", "/admin/videos"] {
            let response = send(&app, get(path)).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "/admin/login");
        }

        let login = send(&app, get("/admin/login")).await;
        assert_eq!(login.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forged_cookie_passes_the_guard_but_not_the_page() {
        let app = build_app(test_state().await);
        let request = Request::builder()
            .uri("/admin/dashboard")
            .header(header::COOKIE, "auth-token=forged")
            .body(Body::empty())
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    }

    #[tokio::test]
    async fn admin_api_requires_a_valid_token() {
        let state = test_state().await;
        let app = build_app(state.clone());

        let anonymous = send(&app, get("/api/admin/videos")).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let bearer = Request::builder()
            .uri("/api/admin/analytics")
            .header(header::AUTHORIZATION, format!("Bearer {}", admin_cookie(&state).trim_start_matches("auth-token=")))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, bearer).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn form_login_sets_cookie_and_opens_dashboard() {
        let state = test_state().await;
        seed_admin(&state).await;
        let app = build_app(state);

        let login = Request::builder()
            .method(Method::POST)
            .uri("/admin/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "email=admin%40mundomusical.com&password={}",
                ADMIN_PASSWORD
            )))
            .unwrap();
        let response = send(&app, login).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin/dashboard");

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("auth-token="));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let dashboard = Request::builder()
            .uri("/admin/dashboard")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, dashboard).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&html).contains(ADMIN_EMAIL));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let state = test_state().await;
        seed_admin(&state).await;
        let app = build_app(state);

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": ADMIN_EMAIL, "password": "nope" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn pasted_url_is_stored_as_platform_id_and_active_flag_controls_listing() {
        let state = test_state().await;
        let cookie = admin_cookie(&state);
        let app = build_app(state);

        let created = send(
            &app,
            json_request(
                Method::POST,
                "/api/admin/videos",
                Some(cookie.as_str()),
                json!({
                    "title": "Dino canta",
                    "videoId": "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
                    "category": "Musical"
                }),
            ),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = json_body(created).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["data"]["videoId"], "dQw4w9WgXcQ");
        assert_eq!(created["data"]["platform"], "youtube");

        let listed = json_body(send(&app, get("/api/videos")).await).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
        assert_eq!(listed["data"][0]["videoId"], "dQw4w9WgXcQ");

        let hide = json_request(
            Method::PATCH,
            &format!("/api/admin/videos/{}/active", id),
            Some(cookie.as_str()),
            json!({ "isActive": false }),
        );
        assert_eq!(send(&app, hide).await.status(), StatusCode::OK);
        let listed = json_body(send(&app, get("/api/videos")).await).await;
        assert!(listed["data"].as_array().unwrap().is_empty());
        assert_eq!(send(&app, get(&format!("/api/videos/{}", id))).await.status(), StatusCode::NOT_FOUND);

        let show = json_request(
            Method::PATCH,
            &format!("/api/admin/videos/{}/active", id),
            Some(cookie.as_str()),
            json!({ "isActive": true }),
        );
        assert_eq!(send(&app, show).await.status(), StatusCode::OK);
        let listed = json_body(send(&app, get("/api/videos")).await).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn playing_one_player_pauses_the_other() {
        let app = build_app(test_state().await);
        let base = "/api/player/sessions/page-1";

        for (container, video) in [("player-a", "AAA"), ("player-b", "BBB")] {
            let response = send(
                &app,
                json_request(
                    Method::POST,
                    &format!("{}/players", base),
                    None,
                    json!({ "containerId": container, "videoId": video }),
                ),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let play = |container: &str| {
            json_request(
                Method::POST,
                &format!("{}/players/{}/state", base, container),
                None,
                json!({ "state": 1 }),
            )
        };

        let first = json_body(send(&app, play("player-a")).await).await;
        assert!(first["data"]["commands"].as_array().unwrap().is_empty());

        let second = json_body(send(&app, play("player-b")).await).await;
        assert_eq!(
            second["data"]["commands"],
            json!([{ "containerId": "player-a", "command": "pause" }])
        );
        assert_eq!(second["data"]["transition"]["paused"][0]["videoId"], "AAA");

        let closed = send(
            &app,
            Request::builder().method(Method::DELETE).uri(base).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(json_body(closed).await["data"]["destroyed"], 2);
    }

    #[tokio::test]
    async fn duplicate_category_is_rejected_before_persisting() {
        let state = test_state().await;
        let cookie = admin_cookie(&state);
        let app = build_app(state);

        let create = |name: &str, language: &str| {
            json_request(
                Method::POST,
                "/api/admin/categories",
                Some(cookie.as_str()),
                json!({ "name": name, "language": language }),
            )
        };

        assert_eq!(send(&app, create("Musical", "pt")).await.status(), StatusCode::CREATED);
        assert_eq!(send(&app, create(" musical ", "pt")).await.status(), StatusCode::CONFLICT);
        assert_eq!(send(&app, create("Musical", "en")).await.status(), StatusCode::CREATED);

        let listed = send(
            &app,
            Request::builder()
                .uri("/api/admin/categories")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(json_body(listed).await["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn maintenance_mode_sends_visitors_to_coming_soon() {
        let state = test_state().await;
        let cookie = admin_cookie(&state);
        let app = build_app(state);

        let enable = json_request(
            Method::PUT,
            "/api/admin/settings",
            Some(cookie.as_str()),
            json!({ "maintenanceMode": true }),
        );
        assert_eq!(send(&app, enable).await.status(), StatusCode::OK);

        let home = send(&app, get("/videos")).await;
        assert_eq!(home.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(home.headers()[header::LOCATION], "/em-breve");

        assert_eq!(send(&app, get("/em-breve")).await.status(), StatusCode::OK);
        assert_eq!(send(&app, get("/admin/login")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn public_pages_and_system_routes_render() {
        let app = build_app(test_state().await);

        for path in ["/", "/sobre", "/contacto", "/videos?category=Musical", "/em-breve"] {
            assert_eq!(send(&app, get(path)).await.status(), StatusCode::OK, "{path}");
        }

        let health = send(&app, get("/health")).await;
        assert_eq!(health.status(), StatusCode::OK);

        let sw = send(&app, get("/sw.js")).await;
        assert!(sw.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript"));

        let manifest = send(&app, get("/manifest.json")).await;
        assert_eq!(json_body(manifest).await["start_url"], "/");
    }
}
