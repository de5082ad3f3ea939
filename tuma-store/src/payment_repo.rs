use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tuma_core::payment::CheckoutId;
use tuma_core::repository::RepoError;
use tuma_payments::models::{Payment, PaymentStatus};
use tuma_payments::repository::PaymentRepository;

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    amount: f64,
    method: String,
    checkout_id: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, RepoError> {
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            amount: self.amount,
            method: self.method,
            checkout_id: CheckoutId::new(self.checkout_id),
            status: self.status.parse::<PaymentStatus>().map_err(RepoError::from)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, order_id, amount, method, checkout_id, status, created_at, updated_at";

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO payments (id, order_id, amount, method, checkout_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(payment.checkout_id.as_str())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_checkout(&self, checkout_id: &CheckoutId) -> Result<Option<Payment>, RepoError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_id = $1"
        ))
        .bind(checkout_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PaymentRow::into_payment).transpose()
    }

    // The pending guard keeps terminal statuses monotonic under
    // duplicate or contradictory callbacks.
    async fn finalize(&self, checkout_id: &CheckoutId, status: PaymentStatus) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2, updated_at = NOW()
             WHERE checkout_id = $1 AND status = 'pending'",
        )
        .bind(checkout_id.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn statuses_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentStatus>, RepoError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT status FROM payments WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(status,)| status.parse::<PaymentStatus>().map_err(RepoError::from))
            .collect()
    }

    async fn statuses_for_orders(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PaymentStatus>>, RepoError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT order_id, status FROM payments
             WHERE order_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut grouped: HashMap<Uuid, Vec<PaymentStatus>> = HashMap::new();
        for (order_id, status) in rows {
            grouped
                .entry(order_id)
                .or_default()
                .push(status.parse::<PaymentStatus>().map_err(RepoError::from)?);
        }
        Ok(grouped)
    }
}
