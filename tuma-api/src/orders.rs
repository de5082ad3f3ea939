use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tuma_core::geo::Coordinates;
use tuma_core::identity::AuthUser;
use tuma_core::repository::{Page, PageRequest};
use tuma_order::lifecycle::{ChangeDestinationRequest, CreateOrderRequest};
use tuma_order::models::{Order, OrderStatus};
use tuma_order::pricing::WeightCategory;
use tuma_payments::models::PaymentStatus;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub parcel_name: String,
    pub description: Option<String>,
    pub weight_kg: f64,
    pub pickup_address: String,
    pub pickup_coords: Option<Coordinates>,
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeDestinationBody {
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteDeliveryBody {
    pub delivery_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub courier_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListOrdersQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(10))
    }
}

/// The one shape an order takes on the wire. The delivery code is
/// absent except on the owning customer's detail view; the payment
/// standing is attached to detail and listing views but not to
/// mutation acknowledgements.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub parcel_name: String,
    pub description: Option<String>,
    pub weight_kg: f64,
    pub weight_category: WeightCategory,
    pub pickup_address: String,
    pub pickup_coords: Option<Coordinates>,
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub price: f64,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    pub parcel_image_url: Option<String>,
    pub current_location: Option<Coordinates>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub picked_up_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl OrderResponse {
    pub fn from_order(order: Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            courier_id: order.courier_id,
            parcel_name: order.parcel_name,
            description: order.description,
            weight_kg: order.weight_kg,
            weight_category: order.weight_category,
            pickup_address: order.pickup_address,
            pickup_coords: order.pickup_coords,
            destination_address: order.destination_address,
            destination_coords: order.destination_coords,
            distance_km: order.distance_km,
            price: order.price,
            status: order.status,
            delivery_code: None,
            payment_status: None,
            parcel_image_url: order.parcel_image_url,
            current_location: order.current_location,
            created_at: order.created_at,
            updated_at: order.updated_at,
            picked_up_at: order.picked_up_at,
            delivered_at: order.delivered_at,
        }
    }

    pub fn with_delivery_code(mut self, code: &tuma_order::models::DeliveryCode) -> Self {
        self.delivery_code = Some(code.as_str().to_string());
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PageResponse<T> {
    pub fn map<S, F: FnMut(S) -> T>(page: Page<S>, f: F) -> Self {
        Self {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Turns a listing page into the wire shape, attaching each order's
/// collapsed payment standing via one batched lookup.
pub async fn order_page_response(
    state: &AppState,
    page: Page<Order>,
) -> Result<PageResponse<OrderResponse>, AppError> {
    let ids: Vec<Uuid> = page.items.iter().map(|order| order.id).collect();
    let statuses = state.payments.status_map(&ids).await?;
    Ok(PageResponse::map(page, |order| {
        let status = statuses.get(&order.id).copied().unwrap_or(PaymentStatus::Pending);
        OrderResponse::from_order(order).with_payment_status(status)
    }))
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order).delete(cancel_order))
        .route("/orders/{id}/destination", patch(change_destination))
        .route("/orders/{id}/complete", post(complete_delivery))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state
        .lifecycle
        .create_order(
            actor,
            CreateOrderRequest {
                parcel_name: body.parcel_name,
                description: body.description,
                weight_kg: body.weight_kg,
                pickup_address: body.pickup_address,
                pickup_coords: body.pickup_coords,
                destination_address: body.destination_address,
                destination_coords: body.destination_coords,
                parcel_image: None,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(order))))
}

async fn list_orders(
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

async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let access = state.lifecycle.get_order(actor, order_id).await?;
    let payment_status = state.payments.status_for_order(order_id).await?;
    let mut response = OrderResponse::from_order(access.order.clone()).with_payment_status(payment_status);
    if access.include_delivery_code {
        response = response.with_delivery_code(&access.order.delivery_code);
    }
    Ok(Json(response))
}

async fn change_destination(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ChangeDestinationBody>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .lifecycle
        .change_destination(
            actor,
            order_id,
            ChangeDestinationRequest {
                destination_address: body.destination_address,
                destination_coords: body.destination_coords,
            },
        )
        .await?;
    Ok(Json(OrderResponse::from_order(order)))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.lifecycle.cancel(actor, order_id).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

async fn complete_delivery(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<CompleteDeliveryBody>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.lifecycle.complete_delivery(actor, order_id, &body.delivery_code).await?;
    Ok(Json(OrderResponse::from_order(order)))
}
