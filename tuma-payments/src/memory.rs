//! In-memory payment store mirroring the Postgres repository's
//! terminal-status guard, for engine tests and local wiring.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use tuma_core::payment::CheckoutId;
use tuma_core::repository::RepoError;

use crate::models::{Payment, PaymentStatus};
use crate::repository::PaymentRepository;

#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<(), RepoError> {
        self.payments.lock().expect("payment map poisoned").insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_checkout(&self, checkout_id: &CheckoutId) -> Result<Option<Payment>, RepoError> {
        Ok(self
            .payments
            .lock()
            .expect("payment map poisoned")
            .values()
            .find(|p| &p.checkout_id == checkout_id)
            .cloned())
    }

    async fn finalize(&self, checkout_id: &CheckoutId, status: PaymentStatus) -> Result<bool, RepoError> {
        let mut map = self.payments.lock().expect("payment map poisoned");
        match map.values_mut().find(|p| &p.checkout_id == checkout_id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = status;
                payment.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn statuses_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentStatus>, RepoError> {
        let map = self.payments.lock().expect("payment map poisoned");
        let mut attempts: Vec<&Payment> = map.values().filter(|p| p.order_id == order_id).collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(attempts.into_iter().map(|p| p.status).collect())
    }

    async fn statuses_for_orders(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PaymentStatus>>, RepoError> {
        let map = self.payments.lock().expect("payment map poisoned");
        let mut attempts: Vec<&Payment> =
            map.values().filter(|p| order_ids.contains(&p.order_id)).collect();
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut grouped: HashMap<Uuid, Vec<PaymentStatus>> = HashMap::new();
        for payment in attempts {
            grouped.entry(payment.order_id).or_default().push(payment.status);
        }
        Ok(grouped)
    }
}
