use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use tuma_core::geo::Coordinates;
use tuma_core::identity::AuthUser;
use tuma_order::models::OrderStatus;
use tuma_order::repository::CourierStats;

use crate::error::AppError;
use crate::orders::{order_page_response, ListOrdersQuery, OrderResponse, PageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: OrderStatus,
    /// Required when the target status is `delivered`.
    pub delivery_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationBody {
    pub lat: f64,
    pub lng: f64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courier/orders", get(list_assigned_orders))
        .route("/courier/orders/{id}/status", patch(update_status))
        .route("/courier/orders/{id}/location", patch(update_location))
        .route("/courier/stats", get(stats))
}

async fn list_assigned_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, AppError> {
    let page = state
        .lifecycle
        .list_orders(actor, query.status, None, query.page_request())
        .await?;
    Ok(Json(order_page_response(&state, page).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .lifecycle
        .update_status(actor, order_id, body.status, body.delivery_code.as_deref())
        .await?;
    Ok(Json(OrderResponse::from_order(order)))
}

async fn update_location(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateLocationBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .lifecycle
        .update_location(actor, order_id, Coordinates::new(body.lat, body.lng))
        .await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

async fn stats(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<Json<CourierStats>, AppError> {
    let stats = state.lifecycle.courier_stats(actor).await?;
    Ok(Json(stats))
}
