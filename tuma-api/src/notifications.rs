use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use tuma_core::identity::AuthUser;
use tuma_core::notify::Notification;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .notifications
        .list_for_user(actor.id, query.unread_only)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = state
        .notifications
        .mark_read(notification_id, actor.id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFoundError("notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "id": notification_id, "is_read": true })))
}
