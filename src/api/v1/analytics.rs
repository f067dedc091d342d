use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::api::common::ApiResponse;
use crate::api::v1::videos::{list_all_videos, Video};
use crate::embed::Platform;
use crate::errors::AppError;
use crate::InnerState;

const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_videos: usize,
    pub active_videos: usize,
    pub total_categories: usize,
    pub youtube_videos: usize,
    pub featured_videos: usize,
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub date: String,
}

impl From<&Video> for Activity {
    fn from(video: &Video) -> Self {
        Activity {
            kind: "video".to_string(),
            message: format!("Vídeo \"{}\" adicionado", video.title),
            date: video.created_at.format("%d/%m/%Y").to_string(),
        }
    }
}

/// Dashboard counters, computed over every video including inactive ones.
/// `videos` must be newest first.
pub fn summarize(videos: &[Video]) -> Analytics {
    let mut categories: Vec<&str> = videos
        .iter()
        .filter_map(|v| v.category.as_deref())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort_unstable();
    categories.dedup();

    Analytics {
        total_videos: videos.len(),
        active_videos: videos.iter().filter(|v| v.is_active).count(),
        total_categories: categories.len(),
        youtube_videos: videos.iter().filter(|v| v.platform == Platform::Youtube).count(),
        featured_videos: videos.iter().filter(|v| v.featured).count(),
        recent_activity: videos
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(Activity::from)
            .collect(),
    }
}

pub async fn compute_analytics(db: &SqlitePool) -> Result<Analytics, AppError> {
    let videos = list_all_videos(db).await?;
    Ok(summarize(&videos))
}

#[tracing::instrument(name = "Dashboard analytics", skip(inner))]
pub async fn get_analytics(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<Analytics>>, AppError> {
    Ok(Json(ApiResponse::success(compute_analytics(&inner.db).await?)))
}
