use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use tuma_core::identity::{AuthUser, User, UserRole};
use tuma_core::repository::PageRequest;
use tuma_order::models::OrderStatus;

use crate::error::AppError;
use crate::orders::{order_page_response, ListOrdersQuery, OrderResponse, PageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignCourierBody {
    pub courier_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ForceStatusBody {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleBody {
    pub role: UserRole,
    pub vehicle_type: Option<String>,
    pub plate_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub vehicle_type: Option<String>,
    pub plate_number: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            vehicle_type: user.vehicle_type,
            plate_number: user.plate_number,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub revenue_trends: Vec<RevenuePoint>,
    pub status_distribution: HashMap<String, i64>,
    pub top_couriers: Vec<CourierRankingResponse>,
}

#[derive(Debug, Serialize)]
pub struct RevenuePoint {
    /// ISO day, e.g. `2026-08-30`.
    pub date: String,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct CourierRankingResponse {
    pub courier_id: Uuid,
    pub name: String,
    pub deliveries: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_users: i64,
    pub total_customers: i64,
    pub total_couriers: i64,
    pub total_orders: i64,
    pub status_counts: HashMap<String, i64>,
    pub total_revenue: f64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_all_orders))
        .route("/admin/orders/{id}/assign-courier", patch(assign_courier))
        .route("/admin/orders/{id}/status", patch(force_status))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/toggle-active", patch(toggle_active))
        .route("/admin/users/{id}/role", patch(set_role))
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/reports", get(reports))
}

async fn list_all_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, AppError> {
    let page = state
        .lifecycle
        .list_orders(actor, query.status, query.courier_id, query.page_request())
        .await?;
    Ok(Json(order_page_response(&state, page).await?))
}

async fn assign_courier(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<AssignCourierBody>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.lifecycle.assign_courier(actor, order_id, body.courier_id).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

async fn force_status(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ForceStatusBody>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.lifecycle.force_status(actor, order_id, body.status).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PageResponse<UserResponse>>, AppError> {
    require_admin(&actor)?;
    let page = PageRequest::new(query.page.unwrap_or(1), query.per_page.unwrap_or(10));
    let users = state
        .users
        .list(query.role, page)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(PageResponse::map(users, UserResponse::from)))
}

async fn toggle_active(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&actor)?;
    let now_active = state
        .users
        .toggle_active(user_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("user not found".to_string()))?;
    tracing::info!(user = %user_id, admin = %actor.id, now_active, "user active flag toggled");
    Ok(Json(serde_json::json!({ "id": user_id, "is_active": now_active })))
}

async fn set_role(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&actor)?;
    if body.role == UserRole::Courier && (body.vehicle_type.is_none() || body.plate_number.is_none()) {
        return Err(AppError::ValidationError(
            "vehicle_type and plate_number are required for couriers".to_string(),
        ));
    }
    let plate_number = match body.plate_number {
        Some(raw) => Some(
            tuma_core::identity::normalize_plate(&raw)
                .map_err(|e| AppError::ValidationError(e.to_string()))?,
        ),
        None => None,
    };
    let updated = state
        .users
        .set_role(user_id, body.role, body.vehicle_type, plate_number)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFoundError("user not found".to_string()));
    }
    tracing::info!(user = %user_id, admin = %actor.id, role = %body.role, "user role changed");
    Ok(Json(serde_json::json!({ "id": user_id, "role": body.role })))
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>, AppError> {
    let stats = state.lifecycle.dashboard(actor).await?;
    Ok(Json(DashboardResponse {
        total_users: stats.total_users,
        total_customers: stats.total_customers,
        total_couriers: stats.total_couriers,
        total_orders: stats.total_orders,
        status_counts: stats
            .status_counts
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect(),
        total_revenue: stats.total_revenue,
    }))
}

async fn reports(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<Json<ReportsResponse>, AppError> {
    let report = state.lifecycle.reports(actor).await?;
    Ok(Json(ReportsResponse {
        revenue_trends: report
            .revenue_trends
            .into_iter()
            .map(|day| RevenuePoint { date: day.date.to_string(), revenue: day.revenue })
            .collect(),
        status_distribution: report
            .status_distribution
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect(),
        top_couriers: report
            .top_couriers
            .into_iter()
            .map(|courier| CourierRankingResponse {
                courier_id: courier.courier_id,
                name: courier.full_name,
                deliveries: courier.deliveries,
            })
            .collect(),
    }))
}

fn require_admin(actor: &AuthUser) -> Result<(), AppError> {
    if actor.role != UserRole::Admin {
        return Err(AppError::AuthorizationError("access denied: admin only".to_string()));
    }
    Ok(())
}
