use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use tuma_core::geo::{Coordinates, DistanceMatrix, Geocoder, StaticDistanceMatrix, StaticGeocoder};
use tuma_core::identity::{AuthUser, User, UserRole};
use tuma_core::mail::NoopImageStore;
use tuma_core::memory::{InMemoryNotificationRepository, InMemoryUserRepository, RecordingMailer};
use tuma_core::notify::NotificationKind;
use tuma_core::repository::PageRequest;

use crate::error::OrderError;
use crate::lifecycle::{ChangeDestinationRequest, CreateOrderRequest, OrderLifecycle};
use crate::memory::InMemoryOrderRepository;
use crate::models::{DeliveryCode, Order, OrderStatus};
use crate::pricing::WeightCategory;
use crate::repository::OrderRepository;

const PICKUP: &str = "Pickup Lane 1, Nairobi";
const DEST: &str = "Destination Rd 9, Nairobi";

fn user(role: UserRole) -> User {
    User {
        id: Uuid::new_v4(),
        full_name: format!("Test {role}"),
        email: format!("{role}@example.com"),
        phone: Some("+254700000001".to_string()),
        role,
        vehicle_type: (role == UserRole::Courier).then(|| "Motorbike".to_string()),
        plate_number: (role == UserRole::Courier).then(|| "KDA 123X".to_string()),
        is_active: true,
        created_at: Utc::now(),
    }
}

fn auth(user: &User) -> AuthUser {
    AuthUser::new(user.id, user.role)
}

struct Harness {
    engine: OrderLifecycle,
    orders: Arc<InMemoryOrderRepository>,
    notifications: Arc<InMemoryNotificationRepository>,
    mailer: Arc<RecordingMailer>,
    customer: User,
    courier: User,
    admin: User,
}

impl Harness {
    fn with(geocoder: StaticGeocoder, routes: StaticDistanceMatrix, mailer: RecordingMailer) -> Self {
        let customer = user(UserRole::Customer);
        let courier = user(UserRole::Courier);
        let admin = user(UserRole::Admin);
        let orders = Arc::new(InMemoryOrderRepository::new());
        let users = Arc::new(InMemoryUserRepository::seeded(vec![
            customer.clone(),
            courier.clone(),
            admin.clone(),
        ]));
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let mailer = Arc::new(mailer);
        let engine = OrderLifecycle::new(
            orders.clone(),
            users.clone(),
            notifications.clone(),
            Arc::new(geocoder) as Arc<dyn Geocoder>,
            Arc::new(routes) as Arc<dyn DistanceMatrix>,
            mailer.clone(),
            Arc::new(NoopImageStore),
        );
        Self { engine, orders, notifications, mailer, customer, courier, admin }
    }

    /// Both addresses resolve, 4.2 km apart.
    fn resolving(route_km: f64) -> Self {
        let geocoder = StaticGeocoder::new()
            .with(PICKUP, Coordinates::new(-1.2833, 36.8167))
            .with(DEST, Coordinates::new(-1.3000, 36.8500));
        Self::with(geocoder, StaticDistanceMatrix::fixed(route_km), RecordingMailer::new())
    }

    fn create_request() -> CreateOrderRequest {
        CreateOrderRequest {
            parcel_name: "Books".to_string(),
            description: None,
            weight_kg: 2.5,
            pickup_address: PICKUP.to_string(),
            destination_address: DEST.to_string(),
            ..Default::default()
        }
    }

    /// Seeds an order directly in the repo, bypassing creation.
    async fn seed_order(&self, status: OrderStatus, courier_id: Option<Uuid>) -> Order {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: self.customer.id,
            courier_id,
            parcel_name: "Books".to_string(),
            description: None,
            weight_kg: 2.5,
            weight_category: WeightCategory::Medium,
            pickup_address: PICKUP.to_string(),
            pickup_coords: Some(Coordinates::new(-1.2833, 36.8167)),
            destination_address: DEST.to_string(),
            destination_coords: Some(Coordinates::new(-1.3000, 36.8500)),
            distance_km: Some(4.2),
            price: 10.00,
            status,
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

#[tokio::test]
async fn create_order_applies_the_price_floor() {
    let h = Harness::resolving(4.2);
    let order = h.engine.create_order(auth(&h.customer), Harness::create_request()).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.distance_km, Some(4.2));
    assert_eq!(order.price, 10.00);
    assert_eq!(order.weight_category, WeightCategory::Medium);
    assert!(order.courier_id.is_none());

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::OrderCreated);
    assert_eq!(notes[0].user_id, h.customer.id);

    // The delivery code goes out in exactly one email.
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html_body.contains(order.delivery_code.as_str()));
}

#[tokio::test]
async fn create_order_prices_long_routes_per_km() {
    let h = Harness::resolving(42.0);
    let order = h.engine.create_order(auth(&h.customer), Harness::create_request()).await.unwrap();
    assert_eq!(order.price, 42.00);
}

#[tokio::test]
async fn geocoding_failure_falls_back_to_default_distance() {
    let h = Harness::with(StaticGeocoder::new(), StaticDistanceMatrix::fixed(42.0), RecordingMailer::new());
    let order = h.engine.create_order(auth(&h.customer), Harness::create_request()).await.unwrap();
    assert!(order.pickup_coords.is_none());
    assert_eq!(order.distance_km, Some(5.0));
    assert_eq!(order.price, 10.00);
}

#[tokio::test]
async fn route_failure_falls_back_to_default_distance() {
    let geocoder = StaticGeocoder::new()
        .with(PICKUP, Coordinates::new(-1.2833, 36.8167))
        .with(DEST, Coordinates::new(-1.3000, 36.8500));
    let h = Harness::with(geocoder, StaticDistanceMatrix::unavailable(), RecordingMailer::new());
    let order = h.engine.create_order(auth(&h.customer), Harness::create_request()).await.unwrap();
    assert_eq!(order.distance_km, Some(5.0));
}

#[tokio::test]
async fn identical_coordinates_mean_zero_distance() {
    let mut req = Harness::create_request();
    req.pickup_coords = Some(Coordinates::new(-1.2833, 36.8167));
    req.destination_coords = Some(Coordinates::new(-1.2833, 36.8167));
    // Distance matrix would say 42 km, but it must not be consulted.
    let h = Harness::with(StaticGeocoder::new(), StaticDistanceMatrix::fixed(42.0), RecordingMailer::new());
    let order = h.engine.create_order(auth(&h.customer), req).await.unwrap();
    assert_eq!(order.distance_km, Some(0.0));
    assert_eq!(order.price, 10.00);
}

#[tokio::test]
async fn explicit_coordinates_bypass_geocoding() {
    let mut req = Harness::create_request();
    req.pickup_coords = Some(Coordinates::new(-1.2833, 36.8167));
    req.destination_coords = Some(Coordinates::new(-1.3000, 36.8500));
    let h = Harness::with(StaticGeocoder::new(), StaticDistanceMatrix::fixed(12.5), RecordingMailer::new());
    let order = h.engine.create_order(auth(&h.customer), req).await.unwrap();
    assert_eq!(order.distance_km, Some(12.5));
    assert_eq!(order.price, 12.50);
}

#[tokio::test]
async fn create_order_survives_a_failing_mailer() {
    let geocoder = StaticGeocoder::new();
    let h = Harness::with(geocoder, StaticDistanceMatrix::unavailable(), RecordingMailer::failing());
    let order = h.engine.create_order(auth(&h.customer), Harness::create_request()).await;
    assert!(order.is_ok());
}

#[tokio::test]
async fn only_customers_create_orders() {
    let h = Harness::resolving(4.2);
    let err = h.engine.create_order(auth(&h.courier), Harness::create_request()).await.unwrap_err();
    assert!(matches!(err, OrderError::Authorization(_)));
}

#[tokio::test]
async fn zero_weight_is_rejected() {
    let h = Harness::resolving(4.2);
    let mut req = Harness::create_request();
    req.weight_kg = 0.0;
    let err = h.engine.create_order(auth(&h.customer), req).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}

#[tokio::test]
async fn courier_walks_the_happy_path_with_timestamps() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;
    let courier = auth(&h.courier);

    let order_after = h.engine.update_status(courier, order.id, OrderStatus::PickedUp, None).await.unwrap();
    assert_eq!(order_after.status, OrderStatus::PickedUp);
    assert!(order_after.picked_up_at.is_some());

    let order_after = h.engine.update_status(courier, order.id, OrderStatus::InTransit, None).await.unwrap();
    assert_eq!(order_after.status, OrderStatus::InTransit);

    let order_after = h.engine.complete_delivery(courier, order.id, "042137").await.unwrap();
    assert_eq!(order_after.status, OrderStatus::Delivered);
    assert!(order_after.delivered_at.is_some());
}

#[tokio::test]
async fn transitions_outside_the_table_fail_naming_both_states() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let err = h
        .engine
        .update_status(auth(&h.courier), order.id, OrderStatus::Delivered, Some("042137"))
        .await
        .unwrap_err();
    match err {
        OrderError::InvalidTransition { from, to } => {
            assert_eq!(from, OrderStatus::Assigned);
            assert_eq!(to, OrderStatus::Delivered);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert_eq!(h.orders.get(order.id).await.unwrap().unwrap().status, OrderStatus::Assigned);
}

#[tokio::test]
async fn requesting_the_current_status_is_a_noop() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::PickedUp, Some(h.courier.id)).await;

    let before = h.orders.get(order.id).await.unwrap().unwrap();
    let after = h
        .engine
        .update_status(auth(&h.courier), order.id, OrderStatus::PickedUp, None)
        .await
        .unwrap();
    assert_eq!(after.status, OrderStatus::PickedUp);
    assert_eq!(after.picked_up_at, before.picked_up_at);
    // No notification or email for a no-op.
    assert!(h.notifications.all().is_empty());
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn wrong_delivery_code_leaves_the_order_in_transit() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;

    let err = h.engine.complete_delivery(auth(&h.courier), order.id, "000000").await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    let stored = h.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::InTransit);
    assert!(stored.delivered_at.is_none());
}

#[tokio::test]
async fn delivery_code_is_trimmed_before_comparison() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;

    let delivered = h.engine.complete_delivery(auth(&h.courier), order.id, " 042137 ").await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::OrderDelivered);
    assert_eq!(notes[0].user_id, h.customer.id);
}

#[tokio::test]
async fn generic_status_path_also_demands_the_code_for_delivered() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;

    let err = h
        .engine
        .update_status(auth(&h.courier), order.id, OrderStatus::Delivered, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}

#[tokio::test]
async fn courier_cannot_move_someone_elses_order() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(Uuid::new_v4())).await;

    let err = h
        .engine
        .update_status(auth(&h.courier), order.id, OrderStatus::PickedUp, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Authorization(_)));
}

#[tokio::test]
async fn assignment_requires_a_pending_order() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let err = h.engine.assign_courier(auth(&h.admin), order.id, h.courier.id).await.unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));
    let stored = h.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Assigned);
    assert_eq!(stored.courier_id, Some(h.courier.id));
}

#[tokio::test]
async fn assignment_flips_status_and_notifies_both_parties() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let assigned = h.engine.assign_courier(auth(&h.admin), order.id, h.courier.id).await.unwrap();
    assert_eq!(assigned.status, OrderStatus::Assigned);
    assert_eq!(assigned.courier_id, Some(h.courier.id));

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().any(|n| n.user_id == h.courier.id && n.kind == NotificationKind::Assignment));
    assert!(notes.iter().any(|n| n.user_id == h.customer.id && n.kind == NotificationKind::Assignment));
}

#[tokio::test]
async fn assignment_rejects_unknown_or_inactive_couriers() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let err = h.engine.assign_courier(auth(&h.admin), order.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound(_)));
    assert_eq!(h.orders.get(order.id).await.unwrap().unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn cancelled_orders_accept_no_further_transitions() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let cancelled = h.engine.cancel(auth(&h.customer), order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = h.engine.assign_courier(auth(&h.admin), order.id, h.courier.id).await.unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));
}

#[tokio::test]
async fn cancel_is_pending_only() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;

    let err = h.engine.cancel(auth(&h.customer), order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));
}

#[tokio::test]
async fn admin_force_status_bypasses_the_table_and_stamps() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let forced = h.engine.force_status(auth(&h.admin), order.id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(forced.status, OrderStatus::Delivered);
    assert!(forced.delivered_at.is_some());

    let notes = h.notifications.all();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].user_id, h.customer.id);
}

#[tokio::test]
async fn courier_driven_force_is_rejected() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Pending, None).await;
    let err = h.engine.force_status(auth(&h.courier), order.id, OrderStatus::Delivered).await.unwrap_err();
    assert!(matches!(err, OrderError::Authorization(_)));
}

#[tokio::test]
async fn destination_change_reprices_the_order() {
    let h = Harness::resolving(42.0);
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let updated = h
        .engine
        .change_destination(
            auth(&h.customer),
            order.id,
            ChangeDestinationRequest {
                destination_address: DEST.to_string(),
                destination_coords: Some(Coordinates::new(-1.45, 36.99)),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.distance_km, Some(42.0));
    assert_eq!(updated.price, 42.00);
}

#[tokio::test]
async fn destination_change_keeps_old_distance_when_routing_fails() {
    let geocoder = StaticGeocoder::new();
    let h = Harness::with(geocoder, StaticDistanceMatrix::unavailable(), RecordingMailer::new());
    let order = h.seed_order(OrderStatus::Pending, None).await;

    let updated = h
        .engine
        .change_destination(
            auth(&h.customer),
            order.id,
            ChangeDestinationRequest {
                destination_address: "Somewhere unresolvable".to_string(),
                destination_coords: None,
            },
        )
        .await
        .unwrap();
    // Re-resolution failed: previous distance and its price survive.
    assert_eq!(updated.distance_km, order.distance_km);
    assert_eq!(updated.price, 10.00);
}

#[tokio::test]
async fn destination_change_requires_a_pending_order() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let err = h
        .engine
        .change_destination(
            auth(&h.customer),
            order.id,
            ChangeDestinationRequest { destination_address: DEST.to_string(), destination_coords: None },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));
}

#[tokio::test]
async fn location_updates_are_bounds_checked() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let err = h
        .engine
        .update_location(auth(&h.courier), order.id, Coordinates::new(100.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));

    h.engine
        .update_location(auth(&h.courier), order.id, Coordinates::new(-1.286389, 36.817223))
        .await
        .unwrap();
    let stored = h.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.current_location, Some(Coordinates::new(-1.286389, 36.817223)));
}

#[tokio::test]
async fn delivery_code_is_hidden_from_non_owners() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let owner_view = h.engine.get_order(auth(&h.customer), order.id).await.unwrap();
    assert!(owner_view.include_delivery_code);

    let courier_view = h.engine.get_order(auth(&h.courier), order.id).await.unwrap();
    assert!(!courier_view.include_delivery_code);

    let admin_view = h.engine.get_order(auth(&h.admin), order.id).await.unwrap();
    assert!(!admin_view.include_delivery_code);
}

#[tokio::test]
async fn listing_is_role_scoped() {
    let h = Harness::resolving(4.2);
    h.seed_order(OrderStatus::Pending, None).await;
    h.seed_order(OrderStatus::Assigned, Some(h.courier.id)).await;

    let mine = h.engine.list_orders(auth(&h.customer), None, None, PageRequest::default()).await.unwrap();
    assert_eq!(mine.total, 2);

    let assigned = h.engine.list_orders(auth(&h.courier), None, None, PageRequest::default()).await.unwrap();
    assert_eq!(assigned.total, 1);

    let pending_only = h
        .engine
        .list_orders(auth(&h.admin), Some(OrderStatus::Pending), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(pending_only.total, 1);
}

#[tokio::test]
async fn courier_stats_count_deliveries_and_earnings() {
    let h = Harness::resolving(4.2);
    let order = h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;
    h.engine.complete_delivery(auth(&h.courier), order.id, "042137").await.unwrap();
    h.seed_order(OrderStatus::InTransit, Some(h.courier.id)).await;

    let stats = h.engine.courier_stats(auth(&h.courier)).await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.delivered_orders, 1);
    assert_eq!(stats.in_transit_orders, 1);
    assert_eq!(stats.earnings, 10.00);
}

#[tokio::test]
async fn reports_aggregate_revenue_distribution_and_courier_ranking() {
    let h = Harness::resolving(4.2);
    h.seed_order(OrderStatus::Delivered, Some(h.courier.id)).await;
    h.seed_order(OrderStatus::Delivered, Some(h.courier.id)).await;
    let other_courier = Uuid::new_v4();
    h.seed_order(OrderStatus::Delivered, Some(other_courier)).await;
    h.seed_order(OrderStatus::Pending, None).await;

    let report = h.engine.reports(auth(&h.admin)).await.unwrap();

    // All three deliveries were placed today, at 10.00 each.
    assert_eq!(report.revenue_trends.len(), 1);
    assert_eq!(report.revenue_trends[0].date, Utc::now().date_naive());
    assert_eq!(report.revenue_trends[0].revenue, 30.00);

    assert_eq!(report.status_distribution[&OrderStatus::Delivered], 3);
    assert_eq!(report.status_distribution[&OrderStatus::Pending], 1);

    assert_eq!(report.top_couriers.len(), 2);
    assert_eq!(report.top_couriers[0].courier_id, h.courier.id);
    assert_eq!(report.top_couriers[0].full_name, h.courier.full_name);
    assert_eq!(report.top_couriers[0].deliveries, 2);
    assert_eq!(report.top_couriers[1].courier_id, other_courier);
    assert_eq!(report.top_couriers[1].deliveries, 1);
}

#[tokio::test]
async fn reports_are_admin_only() {
    let h = Harness::resolving(4.2);
    let err = h.engine.reports(auth(&h.customer)).await.unwrap_err();
    assert!(matches!(err, OrderError::Authorization(_)));
}
