use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Opaque request identifier assigned by the push-payment provider at
/// initiation time. It is the only key the asynchronous callback
/// carries, so reconciliation matches on it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CheckoutId(String);

impl CheckoutId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),

    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// STK-push style payment initiation. The provider later reports the
/// outcome through an asynchronous callback keyed by the returned id.
#[async_trait]
pub trait PushPaymentGateway: Send + Sync {
    async fn initiate(
        &self,
        phone: &str,
        amount: f64,
        order_ref: Uuid,
    ) -> Result<CheckoutId, GatewayError>;
}

/// Gateway stand-in that hands out sequential checkout ids, or fails
/// every request when constructed with `failing`.
#[derive(Debug, Default)]
pub struct MockPushPaymentGateway {
    counter: AtomicU64,
    failing: bool,
}

impl MockPushPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { counter: AtomicU64::new(0), failing: true }
    }
}

#[async_trait]
impl PushPaymentGateway for MockPushPaymentGateway {
    async fn initiate(
        &self,
        phone: &str,
        amount: f64,
        order_ref: Uuid,
    ) -> Result<CheckoutId, GatewayError> {
        if self.failing {
            return Err(GatewayError::Unavailable("gateway offline".to_string()));
        }
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%phone, amount, %order_ref, "mock STK push initiated");
        Ok(CheckoutId::new(format!("ws_CO_{}_{}", order_ref.simple(), seq)))
    }
}
