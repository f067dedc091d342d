use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::common::utils::{timeout_query, QUERY_TIMEOUT};
use crate::api::common::{ApiResponse, Language};
use crate::embed::{embed_url, extract_video_id, thumbnail_url, Platform};
use crate::errors::AppError;
use crate::InnerState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub platform: Platform,
    pub video_id: String,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub language: Language,
    pub featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A video as shown to visitors, with its player and thumbnail URLs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVideo {
    #[serde(flatten)]
    pub video: Video,
    pub embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<Video> for PublicVideo {
    fn from(video: Video) -> Self {
        let embed = embed_url(video.platform, &video.video_id, None)
            .map(|u| u.to_string())
            .map_err(|e| tracing::warn!("Could not build embed URL for {}: {}", video.id, e))
            .ok();
        let thumbnail = thumbnail_url(video.platform, &video.video_id);
        PublicVideo {
            video,
            embed_url: embed,
            thumbnail_url: thumbnail,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Body of the admin video form. `videoId` may be a full pasted URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub platform: Option<Platform>,
    #[serde(alias = "embedId", alias = "url")]
    pub video_id: String,
    pub duration: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_true", alias = "published")]
    pub is_active: bool,
}

/// A validated video form, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDraft {
    pub title: String,
    pub description: String,
    pub platform: Platform,
    pub video_id: String,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub language: Language,
    pub featured: bool,
    pub is_active: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<VideoRequest> for VideoDraft {
    type Error = AppError;

    fn try_from(request: VideoRequest) -> Result<Self, Self::Error> {
        let mut errors: HashMap<String, Vec<String>> = HashMap::new();

        let title = request.title.trim().to_string();
        if title.is_empty() {
            errors
                .entry("title".to_string())
                .or_default()
                .push("Title is required".to_string());
        }

        let video_id = extract_video_id(&request.video_id);
        if video_id.is_none() {
            errors
                .entry("videoId".to_string())
                .or_default()
                .push("A video URL or id is required".to_string());
        }

        if !errors.is_empty() {
            return Err(AppError::ValidationErrors(errors));
        }

        let platform = request
            .platform
            .or_else(|| Platform::detect(&request.video_id))
            .unwrap_or(Platform::Youtube);

        Ok(VideoDraft {
            title,
            description: request.description.trim().to_string(),
            platform,
            video_id: video_id.unwrap_or_default(),
            duration: non_blank(request.duration),
            category: non_blank(request.category),
            language: request.language,
            featured: request.featured,
            is_active: request.is_active,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFilter {
    pub category: Option<String>,
    pub language: Option<Language>,
    pub platform: Option<Platform>,
    pub featured: Option<bool>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedRequest {
    pub featured: bool,
}

// ---- storage ----

#[tracing::instrument(name = "List active videos", skip(db))]
pub async fn list_active_videos(db: &SqlitePool, filter: &VideoFilter) -> Result<Vec<Video>, AppError> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM videos WHERE is_active = 1");

    if let Some(category) = filter.category.as_ref().filter(|c| !c.is_empty()) {
        query.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(language) = filter.language {
        query.push(" AND language = ").push_bind(language);
    }
    if let Some(platform) = filter.platform {
        query.push(" AND platform = ").push_bind(platform);
    }
    if let Some(featured) = filter.featured {
        query.push(" AND featured = ").push_bind(featured);
    }
    query.push(" ORDER BY created_at DESC, rowid DESC");
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(i64::from(limit.clamp(1, 200)));
    }

    timeout_query(QUERY_TIMEOUT, query.build_query_as::<Video>().fetch_all(db)).await
}

#[tracing::instrument(name = "List all videos", skip(db))]
pub async fn list_all_videos(db: &SqlitePool) -> Result<Vec<Video>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Video>("SELECT * FROM videos ORDER BY created_at DESC, rowid DESC")
            .fetch_all(db),
    )
    .await
}

pub async fn find_video(db: &SqlitePool, id: &str) -> Result<Option<Video>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(db),
    )
    .await
}

#[tracing::instrument(name = "Insert video", skip(db, draft), fields(title = %draft.title))]
pub async fn insert_video(db: &SqlitePool, draft: VideoDraft) -> Result<Video, AppError> {
    let now = Utc::now();
    let video = Video {
        id: Uuid::new_v4().to_string(),
        title: draft.title,
        description: draft.description,
        platform: draft.platform,
        video_id: draft.video_id,
        duration: draft.duration,
        category: draft.category,
        language: draft.language,
        featured: draft.featured,
        is_active: draft.is_active,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"INSERT INTO videos
        (id, title, description, platform, video_id, duration, category, language, featured, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&video.id)
    .bind(&video.title)
    .bind(&video.description)
    .bind(video.platform)
    .bind(&video.video_id)
    .bind(&video.duration)
    .bind(&video.category)
    .bind(video.language)
    .bind(video.featured)
    .bind(video.is_active)
    .bind(video.created_at)
    .bind(video.updated_at)
    .execute(db)
    .await?;

    tracing::info!("Video {} created with platform id {}", video.id, video.video_id);
    Ok(video)
}

/// Replaces every editable field. The creation date is kept.
#[tracing::instrument(name = "Update video", skip(db, draft))]
pub async fn update_video(db: &SqlitePool, id: &str, draft: VideoDraft) -> Result<Video, AppError> {
    let result = sqlx::query(
        r#"UPDATE videos SET
        title = ?, description = ?, platform = ?, video_id = ?, duration = ?, category = ?,
        language = ?, featured = ?, is_active = ?, updated_at = ?
        WHERE id = ?"#,
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.platform)
    .bind(&draft.video_id)
    .bind(&draft.duration)
    .bind(&draft.category)
    .bind(draft.language)
    .bind(draft.featured)
    .bind(draft.is_active)
    .bind(Utc::now())
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Video {} not found", id)));
    }

    find_video(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))
}

async fn set_flag(db: &SqlitePool, id: &str, column: &str, value: bool) -> Result<Video, AppError> {
    // column names come from the two callers below, never from input
    let sql = format!("UPDATE videos SET {} = ?, updated_at = ? WHERE id = ?", column);
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Video {} not found", id)));
    }

    find_video(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))
}

pub async fn set_video_active(db: &SqlitePool, id: &str, is_active: bool) -> Result<Video, AppError> {
    set_flag(db, id, "is_active", is_active).await
}

pub async fn set_video_featured(db: &SqlitePool, id: &str, featured: bool) -> Result<Video, AppError> {
    set_flag(db, id, "featured", featured).await
}

#[tracing::instrument(name = "Delete video", skip(db))]
pub async fn delete_video(db: &SqlitePool, id: &str) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM videos WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Video {} not found", id)));
    }
    Ok(())
}

/// Distinct, sorted category labels used by active videos.
pub async fn active_video_categories(db: &SqlitePool) -> Result<Vec<String>, AppError> {
    timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, String>(
            r#"SELECT DISTINCT category FROM videos
            WHERE is_active = 1 AND category IS NOT NULL AND category != ''
            ORDER BY category"#,
        )
        .fetch_all(db),
    )
    .await
}

// ---- public handlers ----

#[tracing::instrument(name = "Public video list", skip(inner))]
pub async fn list_videos(
    State(inner): State<InnerState>,
    Query(filter): Query<VideoFilter>,
) -> Result<Json<ApiResponse<Vec<PublicVideo>>>, AppError> {
    let videos = list_active_videos(&inner.db, &filter).await?;
    Ok(Json(ApiResponse::success(
        videos.into_iter().map(PublicVideo::from).collect(),
    )))
}

#[tracing::instrument(name = "Public video by id", skip(inner))]
pub async fn get_video(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublicVideo>>, AppError> {
    let video = find_video(&inner.db, &id)
        .await?
        .filter(|v| v.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;
    Ok(Json(ApiResponse::success(video.into())))
}

#[tracing::instrument(name = "Public video categories", skip(inner))]
pub async fn list_video_categories(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(
        active_video_categories(&inner.db).await?,
    )))
}

// ---- admin handlers ----

#[tracing::instrument(name = "Admin video list", skip(inner))]
pub async fn admin_list_videos(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Vec<Video>>>, AppError> {
    Ok(Json(ApiResponse::success(list_all_videos(&inner.db).await?)))
}

#[tracing::instrument(name = "Create video", skip(inner, payload))]
pub async fn create_video(
    State(inner): State<InnerState>,
    Json(payload): Json<VideoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Video>>), AppError> {
    let draft = VideoDraft::try_from(payload)?;
    let video = insert_video(&inner.db, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(video, "Video created")),
    ))
}

#[tracing::instrument(name = "Edit video", skip(inner, payload))]
pub async fn edit_video(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<VideoRequest>,
) -> Result<Json<ApiResponse<Video>>, AppError> {
    let draft = VideoDraft::try_from(payload)?;
    let video = update_video(&inner.db, &id, draft).await?;
    Ok(Json(ApiResponse::with_message(video, "Video updated")))
}

#[tracing::instrument(name = "Toggle video active flag", skip(inner))]
pub async fn patch_video_active(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<ActiveRequest>,
) -> Result<Json<ApiResponse<Video>>, AppError> {
    let video = set_video_active(&inner.db, &id, payload.is_active).await?;
    Ok(Json(ApiResponse::success(video)))
}

#[tracing::instrument(name = "Toggle video featured flag", skip(inner))]
pub async fn patch_video_featured(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<FeaturedRequest>,
) -> Result<Json<ApiResponse<Video>>, AppError> {
    let video = set_video_featured(&inner.db, &id, payload.featured).await?;
    Ok(Json(ApiResponse::success(video)))
}

#[tracing::instrument(name = "Remove video", skip(inner))]
pub async fn remove_video(
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    delete_video(&inner.db, &id).await?;
    Ok(Json(ApiResponse::message("Video deleted")))
}
