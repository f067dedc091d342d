use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::common::utils::{timeout_query, QUERY_TIMEOUT};
use crate::api::common::ApiResponse;
use crate::errors::AppError;
use crate::InnerState;

/// Subjects offered by the contact form, as (value, label).
pub const CONTACT_SUBJECTS: &[(&str, &str)] = &[
    ("duvida", "Dúvida Geral"),
    ("sugestao", "Sugestão"),
    ("problema", "Problema Técnico"),
    ("parcerias", "Parcerias"),
    ("outros", "Outros"),
];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

fn require_valid_email(email: &str) -> Result<(), AppError> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(AppError::Validation("Por favor, insere um email válido.".to_string()))
    }
}

#[tracing::instrument(name = "Store contact message", skip(db, request))]
pub async fn store_contact_message(
    db: &SqlitePool,
    request: ContactRequest,
) -> Result<ContactMessage, AppError> {
    let name = request.name.trim();
    let email = request.email.trim();
    let message = request.message.trim();

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::Validation(
            "Por favor, preenche todos os campos obrigatórios.".to_string(),
        ));
    }
    require_valid_email(email)?;

    let subject = request
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(subject) = &subject {
        if !CONTACT_SUBJECTS.iter().any(|(value, _)| value == subject) {
            return Err(AppError::Validation(format!("Assunto desconhecido: {}", subject)));
        }
    }

    let contact = ContactMessage {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        subject,
        message: message.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO contact_messages (id, name, email, subject, message, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&contact.id)
    .bind(&contact.name)
    .bind(&contact.email)
    .bind(&contact.subject)
    .bind(&contact.message)
    .bind(contact.created_at)
    .execute(db)
    .await?;

    tracing::info!("Contact message {} received from {}", contact.id, contact.email);
    Ok(contact)
}

#[tracing::instrument(name = "Subscribe newsletter", skip(db, request))]
pub async fn subscribe(db: &SqlitePool, request: NewsletterRequest) -> Result<(), AppError> {
    let name = request.name.trim();
    let email = request.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() {
        return Err(AppError::Validation("Por favor, preenche todos os campos.".to_string()));
    }
    require_valid_email(&email)?;

    let result = sqlx::query(
        "INSERT INTO newsletter_subscribers (id, name, email, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(&email)
    .bind(Utc::now())
    .execute(db)
    .await;

    match result {
        Ok(_) => {
            tracing::info!("New newsletter subscriber: {}", email);
            Ok(())
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tracing::warn!("Newsletter subscriber {} already exists", email);
            Err(AppError::Conflict("Este email já está subscrito.".to_string()))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn list_contact_messages(db: &SqlitePool) -> Result<Vec<ContactMessage>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, ContactMessage>(
            "SELECT * FROM contact_messages ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(db),
    )
    .await
}

// ---- handlers ----

pub async fn submit_contact(
    State(inner): State<InnerState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    store_contact_message(&inner.db, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Mensagem enviada com sucesso!")),
    ))
}

pub async fn subscribe_newsletter(
    State(inner): State<InnerState>,
    Json(payload): Json<NewsletterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    subscribe(&inner.db, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Subscrição feita com sucesso!")),
    ))
}

pub async fn admin_list_contact_messages(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<ContactMessage>>>, AppError> {
    Ok(Json(ApiResponse::success(list_contact_messages(&inner.db).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn contact(name: &str, email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: name.to_string(),
            email: email.to_string(),
            subject: None,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn messages_are_stored_newest_first() {
        let db = test_pool().await;
        store_contact_message(&db, contact("Ana", "ana@example.com", "Olá")).await.unwrap();
        let mut second = contact("Rui", "rui@example.com", "Adoro o Dino");
        second.subject = Some("sugestao".to_string());
        store_contact_message(&db, second).await.unwrap();

        let messages = list_contact_messages(&db).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].name, "Rui");
        assert_eq!(messages[0].subject.as_deref(), Some("sugestao"));
    }

    #[tokio::test]
    async fn missing_fields_and_bad_email_are_rejected() {
        let db = test_pool().await;
        for request in [
            contact("", "ana@example.com", "Olá"),
            contact("Ana", "ana@example.com", "   "),
            contact("Ana", "ana.example.com", "Olá"),
        ] {
            let err = store_contact_message(&db, request).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let mut unknown = contact("Ana", "ana@example.com", "Olá");
        unknown.subject = Some("spam".to_string());
        assert!(store_contact_message(&db, unknown).await.is_err());

        assert!(list_contact_messages(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn newsletter_rejects_repeated_email() {
        let db = test_pool().await;
        let request = |email: &str| NewsletterRequest {
            name: "Ana".to_string(),
            email: email.to_string(),
        };

        subscribe(&db, request("ana@example.com")).await.unwrap();
        let err = subscribe(&db, request(" ANA@example.com ")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = subscribe(&db, request("sem-arroba")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
