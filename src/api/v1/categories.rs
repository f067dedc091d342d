use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::api::common::utils::{timeout_query, QUERY_TIMEOUT};
use crate::api::common::{ApiResponse, Language};
use crate::errors::AppError;
use crate::InnerState;

/// Keyword → emoji, checked in order against the lowercased category name.
const EMOJI_KEYWORDS: &[(&str, &str)] = &[
    ("musical", "🎵"),
    ("musica", "🎵"),
    ("música", "🎵"),
    ("song", "🎵"),
    ("music", "🎵"),
    ("educacional", "📚"),
    ("educational", "📚"),
    ("ensino", "📚"),
    ("aprender", "📚"),
    ("learn", "📚"),
    ("entretenimento", "🎬"),
    ("entertainment", "🎬"),
    ("diversão", "🎉"),
    ("fun", "🎉"),
    ("infantil", "👶"),
    ("criança", "👶"),
    ("child", "👶"),
    ("kids", "👶"),
    ("tutorial", "🎓"),
    ("aventura", "🚀"),
    ("adventure", "🚀"),
    ("família", "👨‍👩‍👧‍👦"),
    ("family", "👨‍👩‍👧‍👦"),
    ("aprendizagem", "🧠"),
    ("learning", "🧠"),
    ("criatividade", "🎨"),
    ("creativity", "🎨"),
    ("arte", "🎨"),
    ("art", "🎨"),
    ("completo", "🎵"),
    ("complete", "🎵"),
];

const DEFAULT_EMOJI: &str = "🏷️";

pub fn guess_emoji(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    EMOJI_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, emoji)| *emoji)
        .unwrap_or(DEFAULT_EMOJI)
}

fn video_count_label(count: i64) -> String {
    format!("{} vídeo{}", count, if count == 1 { "" } else { "s" })
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub language: Language,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the admin category list: either a stored category or a label
/// only found on videos.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub language: Language,
    pub video_count: i64,
    pub derived: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
    pub language: Language,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryOptionsQuery {
    pub language: Option<Language>,
}

struct CategoryFields {
    name: String,
    emoji: String,
    description: String,
    language: Language,
}

impl TryFrom<CategoryRequest> for CategoryFields {
    type Error = AppError;

    fn try_from(request: CategoryRequest) -> Result<Self, Self::Error> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Nome da categoria é obrigatório".to_string()));
        }

        let emoji = request
            .emoji
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| guess_emoji(&name).to_string());
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Categoria {}", name));

        Ok(CategoryFields {
            name,
            emoji,
            description,
            language: request.language,
        })
    }
}

// ---- storage ----

pub async fn list_stored_categories(db: &SqlitePool) -> Result<Vec<Category>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY created_at DESC, rowid DESC")
            .fetch_all(db),
    )
    .await
}

async fn video_category_counts(db: &SqlitePool) -> Result<Vec<(String, Language, i64)>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, (String, Language, i64)>(
            r#"SELECT category, language, COUNT(*) FROM videos
            WHERE category IS NOT NULL AND category != ''
            GROUP BY category, language
            ORDER BY category, language"#,
        )
        .fetch_all(db),
    )
    .await
}

/// Stored categories (newest first, with their video counts) followed by
/// categories that only exist as labels on videos.
#[tracing::instrument(name = "List categories with counts", skip(db))]
pub async fn list_category_entries(db: &SqlitePool) -> Result<Vec<CategoryEntry>, AppError> {
    let stored = list_stored_categories(db).await?;
    let counts = video_category_counts(db).await?;

    let count_by_key: HashMap<(&str, Language), i64> = counts
        .iter()
        .map(|(name, language, count)| ((name.as_str(), *language), *count))
        .collect();

    let mut entries: Vec<CategoryEntry> = stored
        .iter()
        .map(|category| {
            let count = count_by_key
                .get(&(category.name.as_str(), category.language))
                .copied()
                .unwrap_or(0);
            let description = if count > 0 {
                format!("{} ({})", category.description, video_count_label(count))
            } else {
                category.description.clone()
            };
            CategoryEntry {
                id: category.id.clone(),
                name: category.name.clone(),
                emoji: category.emoji.clone(),
                description,
                language: category.language,
                video_count: count,
                derived: false,
                created_at: Some(category.created_at),
            }
        })
        .collect();

    let derived = counts
        .iter()
        .filter(|(name, language, _)| {
            !stored
                .iter()
                .any(|c| c.language == *language && c.name.to_lowercase() == name.to_lowercase())
        })
        .enumerate()
        .map(|(index, (name, language, count))| CategoryEntry {
            id: format!("video_cat_{}", index),
            name: name.clone(),
            emoji: guess_emoji(name).to_string(),
            description: format!("Categoria extraída dos vídeos ({})", video_count_label(*count)),
            language: *language,
            video_count: *count,
            derived: true,
            created_at: None,
        });
    entries.extend(derived);

    Ok(entries)
}

async fn ensure_unique_name(
    db: &SqlitePool,
    name: &str,
    language: Language,
    editing_id: Option<&str>,
) -> Result<(), AppError> {
    let lower = name.to_lowercase();
    let entries = list_category_entries(db).await?;

    let clash = entries.iter().any(|entry| {
        entry.language == language
            && entry.name.to_lowercase() == lower
            && Some(entry.id.as_str()) != editing_id
    });

    if clash {
        tracing::warn!("Category {} already exists for {}", name, language.as_str());
        return Err(AppError::Conflict(format!(
            "Categoria \"{}\" já existe para {}",
            name,
            language.display_name()
        )));
    }
    Ok(())
}

#[tracing::instrument(name = "Insert category", skip(db, request))]
pub async fn insert_category(db: &SqlitePool, request: CategoryRequest) -> Result<Category, AppError> {
    let fields = CategoryFields::try_from(request)?;
    ensure_unique_name(db, &fields.name, fields.language, None).await?;

    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: fields.name,
        emoji: fields.emoji,
        description: fields.description,
        language: fields.language,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"INSERT INTO categories (id, name, emoji, description, language, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.emoji)
    .bind(&category.description)
    .bind(category.language)
    .bind(category.is_active)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(db)
    .await?;

    tracing::info!("Category {} created with id {}", category.name, category.id);
    Ok(category)
}

#[tracing::instrument(name = "Update category", skip(db, request))]
pub async fn update_category(
    db: &SqlitePool,
    id: &str,
    request: CategoryRequest,
) -> Result<Category, AppError> {
    let fields = CategoryFields::try_from(request)?;
    ensure_unique_name(db, &fields.name, fields.language, Some(id)).await?;

    let result = sqlx::query(
        r#"UPDATE categories SET name = ?, emoji = ?, description = ?, language = ?, updated_at = ?
        WHERE id = ?"#,
    )
    .bind(&fields.name)
    .bind(&fields.emoji)
    .bind(&fields.description)
    .bind(fields.language)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }

    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(AppError::from)
}

/// Removes the category document only; videos keep their label.
#[tracing::instrument(name = "Delete category", skip(db))]
pub async fn delete_category(db: &SqlitePool, id: &str) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }
    Ok(())
}

/// Sorted union of stored category names and labels found on videos.
#[tracing::instrument(name = "Category options", skip(db))]
pub async fn category_options(
    db: &SqlitePool,
    language: Option<Language>,
) -> Result<Vec<CategoryOption>, AppError> {
    let stored = list_stored_categories(db).await?;
    let counts = video_category_counts(db).await?;

    let matches = |candidate: Language| language.map_or(true, |l| l == candidate);

    let names: BTreeSet<String> = stored
        .into_iter()
        .filter(|c| matches(c.language))
        .map(|c| c.name)
        .chain(
            counts
                .into_iter()
                .filter(|(_, lang, _)| matches(*lang))
                .map(|(name, _, _)| name),
        )
        .collect();

    let option_language = language.unwrap_or_default();
    Ok(names
        .into_iter()
        .map(|name| CategoryOption {
            value: name.clone(),
            label: name,
            language: option_language,
        })
        .collect())
}

// ---- handlers ----

pub async fn list_category_options(
    State(inner): State<InnerState>,
    Query(query): Query<CategoryOptionsQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryOption>>>, AppError> {
    Ok(Json(ApiResponse::success(
        category_options(&inner.db, query.language).await?,
    )))
}

#[tracing::instrument(name = "Admin category list", skip(inner))]
pub async fn admin_list_categories(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<CategoryEntry>>>, AppError> {
    Ok(Json(ApiResponse::success(list_category_entries(&inner.db).await?)))
}

#[tracing::instrument(name = "Create category", skip(inner, payload))]
pub async fn create_category(
    State(inner): State<InnerState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), AppError> {
    let category = insert_category(&inner.db, payload).await?;
    let message = format!(
        "Categoria \"{}\" criada com sucesso para {}",
        category.name,
        category.language.display_name()
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(category, message))))
}

#[tracing::instrument(name = "Edit category", skip(inner, payload))]
pub async fn edit_category(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = update_category(&inner.db, &id, payload).await?;
    let message = format!("Categoria \"{}\" atualizada com sucesso", category.name);
    Ok(Json(ApiResponse::with_message(category, message)))
}

#[tracing::instrument(name = "Remove category", skip(inner))]
pub async fn remove_category(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    delete_category(&inner.db, &id).await?;
    Ok(Json(ApiResponse::message("Categoria eliminada com sucesso")))
}
