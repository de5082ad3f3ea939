use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use tuma_core::payment::CheckoutId;
use tuma_core::repository::RepoError;

use crate::models::{Payment, PaymentStatus};

/// Payment attempt storage. Reconciliation is keyed by the provider's
/// checkout id, which is unique per attempt.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<(), RepoError>;

    async fn find_by_checkout(&self, checkout_id: &CheckoutId) -> Result<Option<Payment>, RepoError>;

    /// Moves a pending attempt to a terminal status. Returns false when
    /// the attempt is unknown or already terminal, so a repeated or
    /// contradictory callback is a no-op at the storage layer.
    async fn finalize(&self, checkout_id: &CheckoutId, status: PaymentStatus) -> Result<bool, RepoError>;

    /// Attempt statuses for one order, oldest first.
    async fn statuses_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentStatus>, RepoError>;

    /// Attempt statuses for a batch of orders, oldest first per order.
    /// Orders with no attempts are absent from the map.
    async fn statuses_for_orders(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PaymentStatus>>, RepoError>;
}
