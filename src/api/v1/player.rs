use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::common::ApiResponse;
use crate::errors::AppError;
use crate::player::{PlayerError, PlayerState, StateReport};
use crate::InnerState;

impl From<PlayerError> for AppError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::AlreadyRegistered(_) => AppError::Conflict(err.to_string()),
            PlayerError::NotRegistered(_) => AppError::NotFound(err.to_string()),
            PlayerError::UnknownState(_) | PlayerError::TooManyPlayers(_) => {
                AppError::Validation(err.to_string())
            }
            PlayerError::Widget(_) => AppError::Unexpected(anyhow::Error::new(err)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPlayerRequest {
    pub container_id: String,
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StateChangeRequest {
    pub state: PlayerState,
}

#[derive(Debug, Serialize)]
pub struct ClosedSession {
    pub destroyed: usize,
}

#[tracing::instrument(name = "Register player", skip(inner, payload), fields(container = %payload.container_id))]
pub async fn register_player(
    State(inner): State<InnerState>,
    Path(session): Path<String>,
    Json(payload): Json<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    if payload.container_id.trim().is_empty() || payload.video_id.trim().is_empty() {
        return Err(AppError::Validation(
            "containerId and videoId are required".to_string(),
        ));
    }

    inner
        .players
        .register(&session, &payload.container_id, &payload.video_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::message("Player registered"))))
}

#[tracing::instrument(name = "Player state change", skip(inner, payload), fields(state = ?payload.state))]
pub async fn report_player_state(
    State(inner): State<InnerState>,
    Path((session, container)): Path<(String, String)>,
    Json(payload): Json<StateChangeRequest>,
) -> Result<Json<ApiResponse<StateReport>>, AppError> {
    let report = inner
        .players
        .report_state(&session, &container, payload.state)
        .await?;

    if !report.transition.paused.is_empty() {
        tracing::debug!(
            "Player {} started, paused {} other player(s)",
            container,
            report.transition.paused.len()
        );
    }

    Ok(Json(ApiResponse::success(report)))
}

#[tracing::instrument(name = "Close player session", skip(inner))]
pub async fn close_player_session(
    State(inner): State<InnerState>,
    Path(session): Path<String>,
) -> Json<ApiResponse<ClosedSession>> {
    let destroyed = inner.players.close(&session).await;
    Json(ApiResponse::success(ClosedSession { destroyed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn player_errors_map_to_http_statuses() {
        let cases = [
            (PlayerError::AlreadyRegistered("a".into()), StatusCode::CONFLICT),
            (PlayerError::NotRegistered("a".into()), StatusCode::NOT_FOUND),
            (PlayerError::UnknownState(9), StatusCode::BAD_REQUEST),
            (PlayerError::TooManyPlayers(64), StatusCode::BAD_REQUEST),
            (PlayerError::Widget("gone".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn state_codes_deserialize_from_numbers() {
        let request: StateChangeRequest = serde_json::from_str(r#"{"state":1}"#).unwrap();
        assert_eq!(request.state, PlayerState::Playing);
        assert!(serde_json::from_str::<StateChangeRequest>(r#"{"state":4}"#).is_err());
    }
}
