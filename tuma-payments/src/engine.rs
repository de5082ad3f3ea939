use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use tuma_core::identity::{AuthUser, UserRole};
use tuma_core::mail::{EmailAttachment, Mailer};
use tuma_core::notify::{Notification, NotificationKind, NotificationRepository};
use tuma_core::payment::{CheckoutId, PushPaymentGateway};
use tuma_core::repository::UserRepository;
use tuma_order::repository::OrderRepository;

use crate::error::PaymentError;
use crate::models::{derived_status, Payment, PaymentStatus};
use crate::repository::PaymentRepository;
use crate::receipt;

/// Asynchronous provider callback payload, reduced to the fields the
/// reconciliation logic consumes. A result code of zero means success;
/// every other value is a failure described by `result_desc`.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub checkout_id: CheckoutId,
    pub result_code: i64,
    pub result_desc: String,
}

/// Drives payment initiation and callback reconciliation. Payment state
/// lives entirely in this engine's records; the order lifecycle is
/// never touched from here.
pub struct PaymentEngine {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    gateway: Arc<dyn PushPaymentGateway>,
    mailer: Arc<dyn Mailer>,
}

impl PaymentEngine {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        gateway: Arc<dyn PushPaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { payments, orders, users, notifications, gateway, mailer }
    }

    /// Customer triggers an STK push for their own order. The amount is
    /// always the order's stored price; the phone number falls back to
    /// the customer's profile when the request carries none. A record
    /// is persisted only once the provider accepts the push.
    pub async fn initiate(
        &self,
        actor: AuthUser,
        order_id: Uuid,
        phone: Option<String>,
    ) -> Result<Payment, PaymentError> {
        if actor.role != UserRole::Customer {
            return Err(PaymentError::authorization("only customers can pay for orders"));
        }
        let order = self
            .orders
            .get(order_id)
            .await
            .map_err(PaymentError::storage)?
            .ok_or(PaymentError::NotFound("order"))?;
        if order.customer_id != actor.id {
            return Err(PaymentError::authorization("access denied"));
        }
        let customer = self
            .users
            .get(actor.id)
            .await
            .map_err(PaymentError::storage)?
            .ok_or(PaymentError::NotFound("user"))?;

        let phone = phone
            .filter(|p| !p.trim().is_empty())
            .or_else(|| customer.phone.clone())
            .ok_or_else(|| PaymentError::validation("a phone number is required to initiate payment"))?;

        let checkout_id = self
            .gateway
            .initiate(phone.trim(), order.price, order.id)
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let payment = Payment::pending(order.id, order.price, checkout_id);
        self.payments.create(&payment).await.map_err(PaymentError::storage)?;
        tracing::info!(
            payment = %payment.id,
            order = %order.id,
            checkout = %payment.checkout_id,
            amount = payment.amount,
            "payment initiated"
        );
        Ok(payment)
    }

    /// Reconciles a provider callback against the attempt it names.
    /// Attempts already in a terminal status are left untouched, so a
    /// duplicated or contradictory callback changes nothing.
    pub async fn handle_callback(&self, callback: PaymentCallback) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .find_by_checkout(&callback.checkout_id)
            .await
            .map_err(PaymentError::storage)?
            .ok_or(PaymentError::NotFound("payment"))?;

        if payment.status.is_terminal() {
            tracing::info!(
                payment = %payment.id,
                checkout = %callback.checkout_id,
                status = %payment.status,
                "callback for settled payment ignored"
            );
            return Ok(payment);
        }

        let outcome = if callback.result_code == 0 {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let applied = self
            .payments
            .finalize(&callback.checkout_id, outcome)
            .await
            .map_err(PaymentError::storage)?;
        if !applied {
            // Raced with another callback; the stored row already won.
            let settled = self
                .payments
                .find_by_checkout(&callback.checkout_id)
                .await
                .map_err(PaymentError::storage)?
                .ok_or(PaymentError::NotFound("payment"))?;
            return Ok(settled);
        }

        let mut payment = payment;
        payment.status = outcome;
        tracing::info!(
            payment = %payment.id,
            order = %payment.order_id,
            result_code = callback.result_code,
            status = %outcome,
            "payment settled"
        );

        match outcome {
            PaymentStatus::Completed => self.on_completed(&payment).await,
            _ => self.on_failed(&payment, &callback.result_desc).await,
        }
        Ok(payment)
    }

    /// The order's payment standing, collapsed across all attempts.
    pub async fn status_for_order(&self, order_id: Uuid) -> Result<PaymentStatus, PaymentError> {
        let attempts = self.payments.statuses_for_order(order_id).await.map_err(PaymentError::storage)?;
        Ok(derived_status(&attempts))
    }

    /// Collapsed payment standing for a batch of orders in one storage
    /// round trip. Every requested order id gets an entry; orders with
    /// no attempts derive to pending.
    pub async fn status_map(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, PaymentStatus>, PaymentError> {
        let grouped =
            self.payments.statuses_for_orders(order_ids).await.map_err(PaymentError::storage)?;
        Ok(order_ids
            .iter()
            .map(|id| {
                let attempts = grouped.get(id).map(Vec::as_slice).unwrap_or_default();
                (*id, derived_status(attempts))
            })
            .collect())
    }

    async fn on_completed(&self, payment: &Payment) {
        let order = match self.orders.get(payment.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(payment = %payment.id, "order missing, skipping receipt");
                return;
            }
            Err(e) => {
                tracing::warn!(payment = %payment.id, error = %e, "order lookup failed, skipping receipt");
                return;
            }
        };

        self.notify(
            order.customer_id,
            Some(order.id),
            format!("Payment of KES {:.2} received successfully.", payment.amount),
            NotificationKind::PaymentReceived,
        )
        .await;

        match self.users.get(order.customer_id).await {
            Ok(Some(customer)) => {
                let html = receipt::render(&order, payment, &customer);
                let attachment = EmailAttachment {
                    filename: format!("receipt-{}.html", payment.id.simple()),
                    content_type: "text/html".to_string(),
                    content: html.clone().into_bytes(),
                };
                let subject = format!("Tuma - Payment Receipt for Order #{}", order.id.simple());
                if let Err(e) = self.mailer.send(&customer.email, &subject, &html, &[attachment]).await {
                    tracing::warn!(payment = %payment.id, error = %e, "failed to send receipt email");
                }
            }
            Ok(None) => tracing::warn!(payment = %payment.id, "customer missing, skipping receipt email"),
            Err(e) => tracing::warn!(payment = %payment.id, error = %e, "customer lookup failed, skipping receipt email"),
        }
    }

    async fn on_failed(&self, payment: &Payment, reason: &str) {
        let order = match self.orders.get(payment.order_id).await {
            Ok(Some(order)) => order,
            _ => {
                tracing::warn!(payment = %payment.id, "order missing, skipping failure notification");
                return;
            }
        };
        let reason = if reason.trim().is_empty() { "payment was not completed" } else { reason.trim() };
        self.notify(
            order.customer_id,
            Some(order.id),
            format!("Payment failed: {reason}"),
            NotificationKind::PaymentFailed,
        )
        .await;
    }

    async fn notify(&self, user_id: Uuid, order_id: Option<Uuid>, message: String, kind: NotificationKind) {
        let record = Notification::new(user_id, order_id, message, kind);
        if let Err(e) = self.notifications.create(&record).await {
            tracing::warn!(user = %user_id, error = %e, "failed to record notification");
        }
    }
}
