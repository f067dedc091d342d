use crate::errors::AppError;
use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::SqlitePool;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AdminUser {
    pub id: String,
    pub encrypted_password: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(e) => AppError::Authentication(e),
            AuthError::UnexpectedError(e) => AppError::Unexpected(e),
        }
    }
}

#[tracing::instrument(name = "Get stored credentials", skip(pool))]
async fn get_stored_credentials(email: &str, pool: &SqlitePool) -> Result<Option<AdminUser>, anyhow::Error> {
    let row = sqlx::query_as::<_, AdminUser>(
        "SELECT id, encrypted_password FROM admin_users WHERE lower(email) = lower(?)",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await
    .context("Failed to fetch stored credentials")?;

    Ok(row)
}

/// Checks an email/password pair and returns the admin id.
///
/// Unknown emails still go through a full hash verification against a dummy hash
/// so both failure paths cost the same.
#[tracing::instrument(name = "Validate admin credentials", skip(credentials, pool), fields(email = %credentials.email))]
pub async fn validate_credentials(
    credentials: &Credentials,
    pool: &SqlitePool,
) -> Result<String, AuthError> {
    let mut user_id = None;
    let mut expected_password_hash = Secret::new(
        "$argon2id$v=19$m=15000,t=2,p=1$\
        gZiV/M1gPc22ElAH/Jh1Hw$\
        CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno"
            .to_string(),
    );

    if let Some(user) = get_stored_credentials(&credentials.email, pool).await? {
        tracing::debug!("Admin found with ID: {}", user.id);
        user_id = Some(user.id);
        expected_password_hash = Secret::new(user.encrypted_password);
    }

    let candidate = credentials.password.clone();
    tokio::task::spawn_blocking(move || verify_password_hash(expected_password_hash, candidate))
        .await
        .context("Failed to spawn blocking task.")??;

    user_id.ok_or_else(|| {
        tracing::warn!("Credential validation failed - unknown admin: {}", credentials.email);
        AuthError::InvalidCredentials(anyhow::anyhow!("Unknown username."))
    })
}

#[tracing::instrument(name = "Verify password hash", skip(expected_password_hash, password_candidate))]
fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Secret<String>,
) -> Result<(), AuthError> {
    let expected_password_hash = PasswordHash::new(expected_password_hash.expose_secret())
        .context("Failed to parse hash in PHC string format.")?;

    Argon2::default()
        .verify_password(
            password_candidate.expose_secret().as_bytes(),
            &expected_password_hash,
        )
        .context("Invalid password.")
        .map_err(|e| {
            tracing::warn!("Password verification failed: {:?}", e);
            AuthError::InvalidCredentials(e)
        })
}

#[tracing::instrument(name = "Compute password hash", skip(password))]
pub fn compute_password_hash(password: Secret<String>) -> Result<Secret<String>, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());

    let params = Params::new(15000, 2, 1, None).map_err(|e| {
        tracing::error!("Failed to create Argon2 parameters: {:?}", e);
        AppError::Unexpected(anyhow::anyhow!(e).context("Failed to create Argon2 params"))
    })?;

    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {:?}", e);
            AppError::Unexpected(anyhow::anyhow!(e).context("Failed to hash password"))
        })?
        .to_string();

    Ok(Secret::new(password_hash))
}

/// Creates the admin account on first start, or resets its password when the
/// configured one changed.
#[tracing::instrument(name = "Ensure admin user", skip(pool, password))]
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    email: &str,
    password: Secret<String>,
) -> Result<(), AppError> {
    let existing = get_stored_credentials(email, pool).await?;

    if let Some(user) = &existing {
        let stored = Secret::new(user.encrypted_password.clone());
        let candidate = password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password_hash(stored, candidate))
            .await
            .context("Failed to spawn blocking task.")?
            .is_ok();
        if matches {
            tracing::debug!("Admin {} already up to date", email);
            return Ok(());
        }
    }

    let password_hash = tokio::task::spawn_blocking(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")??;

    match existing {
        Some(user) => {
            sqlx::query("UPDATE admin_users SET encrypted_password = ? WHERE id = ?")
                .bind(password_hash.expose_secret())
                .bind(&user.id)
                .execute(pool)
                .await?;
            tracing::info!("Admin {} password updated", email);
        }
        None => {
            sqlx::query(
                "INSERT INTO admin_users (id, email, encrypted_password, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(email.trim())
            .bind(password_hash.expose_secret())
            .bind(Utc::now())
            .execute(pool)
            .await?;
            tracing::info!("Admin {} created", email);
        }
    }

    Ok(())
}
