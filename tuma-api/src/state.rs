use std::sync::Arc;

use tuma_core::notify::NotificationRepository;
use tuma_core::repository::UserRepository;
use tuma_order::lifecycle::OrderLifecycle;
use tuma_payments::engine::PaymentEngine;

/// Token verification settings. Issuance lives with the identity
/// provider, so only the shared secret is carried here.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<OrderLifecycle>,
    pub payments: Arc<PaymentEngine>,
    pub users: Arc<dyn UserRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub auth: AuthConfig,
}
