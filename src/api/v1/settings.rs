use anyhow::Context;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::api::common::utils::{timeout_query, QUERY_TIMEOUT};
use crate::api::common::ApiResponse;
use crate::errors::AppError;
use crate::InnerState;

const SETTINGS_ID: &str = "site";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub site_keywords: String,
    pub maintenance_mode: bool,
    pub contact_email: String,
    pub social_links: SocialLinks,
    pub seo: SeoSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub youtube: String,
    pub instagram: String,
    pub facebook: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeoSettings {
    pub meta_title: String,
    pub meta_description: String,
    pub og_image: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Mundo Musical do Dino".to_string(),
            site_description: "Aventuras musicais educativas com o Dino e sua família".to_string(),
            site_keywords: "música, educação, crianças, dino, entretenimento infantil".to_string(),
            maintenance_mode: false,
            contact_email: "contato@mundomusical.com".to_string(),
            social_links: SocialLinks::default(),
            seo: SeoSettings::default(),
        }
    }
}

impl Default for SeoSettings {
    fn default() -> Self {
        Self {
            meta_title: "Mundo Musical do Dino - Aventuras Musicais Educativas".to_string(),
            meta_description: "Descubra o maravilhoso mundo musical do Dino e sua família. Vídeos educativos e divertidos para crianças aprenderem música de forma lúdica.".to_string(),
            og_image: "/images/dino&family/dino-hero.png".to_string(),
        }
    }
}

/// Recursively merges `patch` into `target`. Objects merge key by key,
/// anything else is replaced.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Stored settings, or the defaults when nothing was saved yet.
pub async fn load_settings(db: &SqlitePool) -> Result<SiteSettings, AppError> {
    let stored: Option<String> = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, String>("SELECT data FROM settings WHERE id = ?")
            .bind(SETTINGS_ID)
            .fetch_optional(db),
    )
    .await?;

    match stored {
        Some(data) => serde_json::from_str(&data)
            .context("Failed to parse stored settings")
            .map_err(AppError::Unexpected),
        None => Ok(SiteSettings::default()),
    }
}

#[tracing::instrument(name = "Save settings", skip(db, settings))]
pub async fn save_settings(db: &SqlitePool, settings: &SiteSettings) -> Result<(), AppError> {
    let data = serde_json::to_string(settings).context("Failed to serialize settings")?;

    sqlx::query(
        r#"INSERT INTO settings (id, data, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
    )
    .bind(SETTINGS_ID)
    .bind(data)
    .bind(Utc::now())
    .execute(db)
    .await?;

    tracing::info!("Site settings saved");
    Ok(())
}

/// Applies a partial settings document on top of the current one.
#[tracing::instrument(name = "Merge settings", skip(db, patch))]
pub async fn merge_settings(db: &SqlitePool, patch: Value) -> Result<SiteSettings, AppError> {
    if !patch.is_object() {
        return Err(AppError::Validation("Settings must be a JSON object".to_string()));
    }

    let current = load_settings(db).await?;
    let mut document = serde_json::to_value(&current).context("Failed to serialize settings")?;
    merge_json(&mut document, patch);

    let merged: SiteSettings = serde_json::from_value(document)
        .map_err(|e| AppError::Validation(format!("Invalid settings: {}", e)))?;

    save_settings(db, &merged).await?;
    Ok(merged)
}

pub async fn get_settings(
    State(inner): State<InnerState>,
) -> Result<Json<ApiResponse<SiteSettings>>, AppError> {
    Ok(Json(ApiResponse::success(load_settings(&inner.db).await?)))
}

#[tracing::instrument(name = "Update settings", skip(inner, patch))]
pub async fn update_settings(
    State(inner): State<InnerState>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<SiteSettings>>, AppError> {
    let settings = merge_settings(&inner.db, patch).await?;
    Ok(Json(ApiResponse::with_message(
        settings,
        "Configurações guardadas com sucesso",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn defaults_are_served_before_anything_is_saved() {
        let db = test_pool().await;
        let settings = load_settings(&db).await.unwrap();
        assert_eq!(settings, SiteSettings::default());
        assert_eq!(settings.site_name, "Mundo Musical do Dino");
        assert!(!settings.maintenance_mode);
    }

    #[tokio::test]
    async fn nested_fields_merge_without_dropping_siblings() {
        let db = test_pool().await;
        merge_settings(&db, json!({ "socialLinks": { "youtube": "https://youtube.com/@dino" } }))
            .await
            .unwrap();
        let merged = merge_settings(&db, json!({ "seo": { "metaTitle": "Dino" }, "maintenanceMode": true }))
            .await
            .unwrap();

        assert_eq!(merged.social_links.youtube, "https://youtube.com/@dino");
        assert_eq!(merged.seo.meta_title, "Dino");
        assert_eq!(merged.seo.og_image, SeoSettings::default().og_image);
        assert!(merged.maintenance_mode);

        assert_eq!(load_settings(&db).await.unwrap(), merged);
    }

    #[tokio::test]
    async fn non_object_patch_is_rejected() {
        let db = test_pool().await;
        let err = merge_settings(&db, json!(["nope"])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn wrongly_typed_field_is_rejected_and_nothing_is_saved() {
        let db = test_pool().await;
        let err = merge_settings(&db, json!({ "maintenanceMode": "yes" })).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(load_settings(&db).await.unwrap(), SiteSettings::default());
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let settings: SiteSettings = serde_json::from_value(json!({ "siteName": "Outro" })).unwrap();
        assert_eq!(settings.site_name, "Outro");
        assert_eq!(settings.contact_email, "contato@mundomusical.com");
    }
}
