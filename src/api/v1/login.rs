use crate::api::common::utils::{remove_auth_cookie, setup_auth_cookie};
use crate::authentication::{validate_credentials, Credentials};
use crate::config::Config;
use crate::errors::AppError;
use crate::InnerState;

use axum::extract::State;
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::Cookies;

const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub role: String,
    pub exp: usize,
}

/// Checks credentials, then sets the auth cookie. Returns the JWT.
#[tracing::instrument(name = "Authenticate admin", skip(credentials, inner, cookies), fields(email = %credentials.email))]
pub async fn authenticate(
    credentials: &Credentials,
    inner: &InnerState,
    cookies: &Cookies,
) -> Result<String, AppError> {
    let user_id = validate_credentials(credentials, &inner.db).await?;
    let token = generate_token(&credentials.email, &user_id, &inner.config)?;
    setup_auth_cookie(&token, &inner.config, cookies);

    tracing::info!("Login completed successfully for admin: {}", credentials.email);
    Ok(token)
}

#[tracing::instrument(name = "Admin login", skip(cookies, inner, credentials))]
pub async fn login_user(
    cookies: Cookies,
    State(inner): State<InnerState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, AppError> {
    authenticate(&credentials, &inner, &cookies).await?;
    Ok(Json(json!({ "data": "login completed" })))
}

#[tracing::instrument(name = "Admin logout", skip(cookies))]
pub async fn logout_user(cookies: Cookies) -> Result<Json<Value>, AppError> {
    remove_auth_cookie(&cookies);
    tracing::info!("Logout completed successfully");
    Ok(Json(json!({ "data": "logout completed" })))
}

#[tracing::instrument(name = "Generate JWT token", skip(user_id, config))]
pub fn generate_token(email: &str, user_id: &str, config: &Config) -> Result<String, AppError> {
    let claims = Claims {
        user_id: user_id.to_owned(),
        sub: email.to_owned(),
        role: "admin".to_owned(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret_token.expose_secret().as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to encode JWT token for {}: {:?}", email, e);
        AppError::Unexpected(anyhow::Error::new(e).context("Failed to encode JWT token"))
    })
}

pub fn decode_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_token.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation failed: {:?}", e);
        AppError::Authentication(anyhow::Error::new(e).context("Invalid token"))
    })
}
