use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tuma_core::identity::AuthUser;
use tuma_core::payment::CheckoutId;
use tuma_payments::engine::PaymentCallback;
use tuma_payments::models::PaymentStatus;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PayOrderBody {
    pub order_id: Uuid,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub checkout_id: String,
    pub status: PaymentStatus,
}

/// Provider webhook payload. Anything beyond these three fields is
/// ignored.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub checkout_id: String,
    pub result_code: i64,
    #[serde(default)]
    pub result_desc: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/payments/pay", post(pay_order))
}

/// The callback route carries no bearer token; the provider is the
/// caller. Mounted outside the auth middleware.
pub fn callback_routes() -> Router<AppState> {
    Router::new().route("/payments/callback", post(payment_callback))
}

async fn pay_order(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(body): Json<PayOrderBody>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let payment = state.payments.initiate(actor, body.order_id, body.phone).await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount,
            method: payment.method,
            checkout_id: payment.checkout_id.as_str().to_string(),
            status: payment.status,
        }),
    ))
}

async fn payment_callback(
    State(state): State<AppState>,
    Json(body): Json<CallbackBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payment = state
        .payments
        .handle_callback(PaymentCallback {
            checkout_id: CheckoutId::new(body.checkout_id),
            result_code: body.result_code,
            result_desc: body.result_desc,
        })
        .await?;
    Ok(Json(serde_json::json!({
        "checkout_id": payment.checkout_id.as_str(),
        "status": payment.status,
    })))
}
