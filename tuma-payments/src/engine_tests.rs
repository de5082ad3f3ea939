use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use tuma_core::identity::{AuthUser, User, UserRole};
use tuma_core::memory::{InMemoryNotificationRepository, InMemoryUserRepository, RecordingMailer};
use tuma_core::notify::NotificationKind;
use tuma_core::payment::{CheckoutId, MockPushPaymentGateway};
use tuma_order::memory::InMemoryOrderRepository;
use tuma_order::models::{DeliveryCode, Order, OrderStatus};
use tuma_order::pricing::WeightCategory;
use tuma_order::repository::OrderRepository;

use crate::engine::{PaymentCallback, PaymentEngine};
use crate::error::PaymentError;
use crate::memory::InMemoryPaymentRepository;
use crate::models::PaymentStatus;
use crate::repository::PaymentRepository;

struct Harness {
    engine: PaymentEngine,
    orders: Arc<InMemoryOrderRepository>,
    payments: Arc<InMemoryPaymentRepository>,
    notifications: Arc<InMemoryNotificationRepository>,
    mailer: Arc<RecordingMailer>,
    customer: User,
}

impl Harness {
    fn new() -> Self {
        Self::build(MockPushPaymentGateway::new(), Some("+254700000001".to_string()))
    }

    fn with_gateway(gateway: MockPushPaymentGateway) -> Self {
        Self::build(gateway, Some("+254700000001".to_string()))
    }

    fn without_profile_phone() -> Self {
        Self::build(MockPushPaymentGateway::new(), None)
    }

    fn build(gateway: MockPushPaymentGateway, phone: Option<String>) -> Self {
        let customer = User {
            id: Uuid::new_v4(),
            full_name: "Amina Odhiambo".to_string(),
            email: "amina@example.com".to_string(),
            phone,
            role: UserRole::Customer,
            vehicle_type: None,
            plate_number: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let users = Arc::new(InMemoryUserRepository::seeded(vec![customer.clone()]));
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let mailer = Arc::new(RecordingMailer::new());
        let engine = PaymentEngine::new(
            payments.clone(),
            orders.clone(),
            users.clone(),
            notifications.clone(),
            Arc::new(gateway),
            mailer.clone(),
        );
        Self { engine, orders, payments, notifications, mailer, customer }
    }

    fn actor(&self) -> AuthUser {
        AuthUser::new(self.customer.id, UserRole::Customer)
    }

    async fn seed_order(&self, price: f64) -> Order {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: self.customer.id,
            courier_id: None,
            parcel_name: "Books".to_string(),
            description: None,
            weight_kg: 2.0,
            weight_category: WeightCategory::Medium,
            pickup_address: "Pickup Lane 1".to_string(),
            pickup_coords: None,
            destination_address: "Destination Rd 9".to_string(),
            destination_coords: None,
            distance_km: Some(12.5),
            price,
            status: OrderStatus::Pending,
            delivery_code: DeliveryCode::from_stored("042137"),
            parcel_image_url: None,
            current_location: None,
            created_at: now,
            updated_at: now,
            picked_up_at: None,
            delivered_at: None,
        };
        self.orders.create(&order).await.unwrap();
        order
    }
}

fn callback(payment: &crate::models::Payment, result_code: i64, desc: &str) -> PaymentCallback {
    PaymentCallback {
        checkout_id: payment.checkout_id.clone(),
        result_code,
        result_desc: desc.to_string(),
    }
}

#[tokio::test]
async fn initiation_charges_the_stored_order_price() {
    let h = Harness::new();
    let order = h.seed_order(42.00).await;

    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();
    assert_eq!(payment.order_id, order.id);
    assert_eq!(payment.amount, 42.00);
    assert_eq!(payment.status, PaymentStatus::Pending);

    let statuses = h.payments.statuses_for_order(order.id).await.unwrap();
    assert_eq!(statuses, vec![PaymentStatus::Pending]);
}

#[tokio::test]
async fn initiation_requires_some_phone_number() {
    let h = Harness::without_profile_phone();
    let order = h.seed_order(10.00).await;

    let err = h.engine.initiate(h.actor(), order.id, Some("  ".to_string())).await.unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));

    // A phone supplied with the request still works.
    let payment = h.engine.initiate(h.actor(), order.id, Some("+254711111111".to_string())).await;
    assert!(payment.is_ok());
}

#[tokio::test]
async fn only_the_owning_customer_can_pay() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;

    let stranger = AuthUser::new(Uuid::new_v4(), UserRole::Customer);
    let err = h.engine.initiate(stranger, order.id, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::Authorization(_)));

    let courier = AuthUser::new(h.customer.id, UserRole::Courier);
    let err = h.engine.initiate(courier, order.id, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::Authorization(_)));
}

#[tokio::test]
async fn gateway_rejection_persists_nothing() {
    let h = Harness::with_gateway(MockPushPaymentGateway::failing());
    let order = h.seed_order(10.00).await;

    let err = h.engine.initiate(h.actor(), order.id, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::Gateway(_)));
    assert!(h.payments.statuses_for_order(order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_callback_completes_and_sends_a_receipt() {
    let h = Harness::new();
    let order = h.seed_order(42.00).await;
    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();

    let settled = h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);
    assert_eq!(h.engine.status_for_order(order.id).await.unwrap(), PaymentStatus::Completed);

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::PaymentReceived);
    assert_eq!(notes[0].user_id, h.customer.id);
    assert!(notes[0].message.contains("42.00"));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, h.customer.email);
    assert_eq!(sent[0].attachment_names.len(), 1);
    assert!(sent[0].attachment_names[0].starts_with("receipt-"));
    assert!(sent[0].html_body.contains("KES 42.00"));
}

#[tokio::test]
async fn failed_callback_records_the_provider_reason() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;
    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();

    let settled = h
        .engine
        .handle_callback(callback(&payment, 1032, "Request cancelled by user"))
        .await
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Failed);

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::PaymentFailed);
    assert!(notes[0].message.contains("Request cancelled by user"));
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn duplicate_callbacks_are_idempotent() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;
    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();

    h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();
    let repeated = h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();
    assert_eq!(repeated.status, PaymentStatus::Completed);

    // One notification and one receipt in total.
    assert_eq!(h.notifications.all().len(), 1);
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn settled_payments_never_change_status() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;
    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();

    h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();
    let contradicted = h
        .engine
        .handle_callback(callback(&payment, 1, "Insufficient funds"))
        .await
        .unwrap();
    assert_eq!(contradicted.status, PaymentStatus::Completed);
    assert_eq!(h.engine.status_for_order(order.id).await.unwrap(), PaymentStatus::Completed);
}

#[tokio::test]
async fn unknown_checkout_ids_are_reported() {
    let h = Harness::new();
    let err = h
        .engine
        .handle_callback(PaymentCallback {
            checkout_id: CheckoutId::new("ws_CO_unknown"),
            result_code: 0,
            result_desc: "Success".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(_)));
}

#[tokio::test]
async fn a_later_completed_attempt_outranks_an_earlier_failure() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;

    let first = h.engine.initiate(h.actor(), order.id, None).await.unwrap();
    h.engine.handle_callback(callback(&first, 1, "Timeout")).await.unwrap();
    assert_eq!(h.engine.status_for_order(order.id).await.unwrap(), PaymentStatus::Failed);

    let second = h.engine.initiate(h.actor(), order.id, None).await.unwrap();
    h.engine.handle_callback(callback(&second, 0, "Success")).await.unwrap();
    assert_eq!(h.engine.status_for_order(order.id).await.unwrap(), PaymentStatus::Completed);
}

#[tokio::test]
async fn status_map_covers_every_requested_order() {
    let h = Harness::new();
    let paid = h.seed_order(25.00).await;
    let failed = h.seed_order(10.00).await;
    let untouched = h.seed_order(10.00).await;

    let payment = h.engine.initiate(h.actor(), paid.id, None).await.unwrap();
    h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();
    let attempt = h.engine.initiate(h.actor(), failed.id, None).await.unwrap();
    h.engine.handle_callback(callback(&attempt, 1, "Timeout")).await.unwrap();

    let map = h.engine.status_map(&[paid.id, failed.id, untouched.id]).await.unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map[&paid.id], PaymentStatus::Completed);
    assert_eq!(map[&failed.id], PaymentStatus::Failed);
    assert_eq!(map[&untouched.id], PaymentStatus::Pending);
}

#[tokio::test]
async fn callbacks_never_touch_the_order_status() {
    let h = Harness::new();
    let order = h.seed_order(10.00).await;
    let payment = h.engine.initiate(h.actor(), order.id, None).await.unwrap();
    h.engine.handle_callback(callback(&payment, 0, "Success")).await.unwrap();

    let stored = h.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}
