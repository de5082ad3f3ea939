use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use tuma_core::geo::{Coordinates, DistanceMatrix, Geocoder};
use tuma_core::identity::{AuthUser, User, UserRole};
use tuma_core::mail::{ImageStore, Mailer};
use tuma_core::notify::{Notification, NotificationKind, NotificationRepository};
use tuma_core::repository::{Page, PageRequest, UserRepository};

use crate::error::OrderError;
use crate::models::{DeliveryCode, Order, OrderStatus};
use crate::pricing::{self, WeightCategory, DEFAULT_DISTANCE_KM};
use crate::repository::{
    CourierLeader, CourierStats, DailyRevenue, OrderFilter, OrderRepository, TransitionStamps,
};

/// Lookback window for the revenue trend report.
const REPORT_WINDOW_DAYS: i64 = 30;
/// Leaderboard depth for the courier ranking report.
const TOP_COURIER_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct CreateOrderRequest {
    pub parcel_name: String,
    pub description: Option<String>,
    pub weight_kg: f64,
    pub pickup_address: String,
    pub pickup_coords: Option<Coordinates>,
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
    pub parcel_image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ChangeDestinationRequest {
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
}

/// An order read together with the caller's visibility into it. The
/// delivery code is only surfaced to the owning customer's detail view.
#[derive(Debug, Clone)]
pub struct OrderAccess {
    pub order: Order,
    pub include_delivery_code: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OperationsReport {
    /// Delivered revenue per day over the report window, oldest first.
    pub revenue_trends: Vec<DailyRevenue>,
    pub status_distribution: HashMap<OrderStatus, i64>,
    pub top_couriers: Vec<CourierRanking>,
}

#[derive(Debug, Clone)]
pub struct CourierRanking {
    pub courier_id: Uuid,
    pub full_name: String,
    pub deliveries: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_customers: i64,
    pub total_couriers: i64,
    pub total_orders: i64,
    pub status_counts: HashMap<OrderStatus, i64>,
    pub total_revenue: f64,
}

/// Owns every mutation of an order's status field. All collaborators
/// are injected; there is no ambient state. External-service failures
/// degrade to documented fallbacks and never abort the primary write;
/// notification and email failures are logged and swallowed.
pub struct OrderLifecycle {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    geocoder: Arc<dyn Geocoder>,
    routes: Arc<dyn DistanceMatrix>,
    mailer: Arc<dyn Mailer>,
    images: Arc<dyn ImageStore>,
}

impl OrderLifecycle {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        geocoder: Arc<dyn Geocoder>,
        routes: Arc<dyn DistanceMatrix>,
        mailer: Arc<dyn Mailer>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self { orders, users, notifications, geocoder, routes, mailer, images }
    }

    /// Customer creates an order. Coordinates and route distance come
    /// from the collaborators with the documented fallbacks, so the
    /// order is created even when every external call fails.
    pub async fn create_order(&self, actor: AuthUser, req: CreateOrderRequest) -> Result<Order, OrderError> {
        if actor.role != UserRole::Customer {
            return Err(OrderError::authorization("only customers can create orders"));
        }
        let customer = self.require_user(actor.id).await?;

        if req.parcel_name.trim().is_empty() {
            return Err(OrderError::validation("parcel_name is required"));
        }
        if req.pickup_address.trim().is_empty() {
            return Err(OrderError::validation("pickup_address is required"));
        }
        if req.destination_address.trim().is_empty() {
            return Err(OrderError::validation("destination_address is required"));
        }
        if !(req.weight_kg > 0.0) {
            return Err(OrderError::validation("weight must be positive"));
        }
        for supplied in [req.pickup_coords, req.destination_coords].into_iter().flatten() {
            if !supplied.is_valid() {
                return Err(OrderError::validation("invalid coordinates"));
            }
        }

        let pickup_coords = self.resolve_coords(req.pickup_coords, &req.pickup_address).await;
        let destination_coords = self.resolve_coords(req.destination_coords, &req.destination_address).await;

        let distance_km = match (pickup_coords, destination_coords) {
            (Some(p), Some(d)) if p == d => 0.0,
            (Some(p), Some(d)) => match self.routes.route(p, d).await {
                Some(est) => est.distance_km,
                None => {
                    tracing::warn!("distance lookup failed, falling back to {DEFAULT_DISTANCE_KM} km");
                    DEFAULT_DISTANCE_KM
                }
            },
            _ => DEFAULT_DISTANCE_KM,
        };

        let price = pricing::quote(req.weight_kg, Some(distance_km));
        let order_id = Uuid::new_v4();
        let delivery_code = DeliveryCode::generate();

        let parcel_image_url = match req.parcel_image {
            Some(bytes) => self.images.upload(&bytes, &format!("parcel-{}.jpg", order_id.simple())).await,
            None => None,
        };

        let now = Utc::now();
        let order = Order {
            id: order_id,
            customer_id: actor.id,
            courier_id: None,
            parcel_name: req.parcel_name.trim().to_string(),
            description: req.description,
            weight_kg: req.weight_kg,
            weight_category: WeightCategory::from_weight(req.weight_kg),
            pickup_address: req.pickup_address.trim().to_string(),
            pickup_coords,
            destination_address: req.destination_address.trim().to_string(),
            destination_coords,
            distance_km: Some(distance_km),
            price,
            status: OrderStatus::Pending,
            delivery_code,
            parcel_image_url,
            current_location: None,
            created_at: now,
            updated_at: now,
            picked_up_at: None,
            delivered_at: None,
        };

        self.orders.create(&order).await.map_err(OrderError::storage)?;
        tracing::info!(order = %order.id, customer = %actor.id, price, distance_km, "order created");

        // The delivery code travels only in this email, never in the
        // order's general JSON representation.
        let subject = format!("Tuma - Order #{} Created", order.id.simple());
        let body = format!(
            "<p>Your order <b>{}</b> has been created.</p>\
             <p>Price: KES {:.2} for {:.1} km.</p>\
             <p>Your delivery confirmation code is <b>{}</b>. Share it with the courier only on handover.</p>",
            order.parcel_name, order.price, distance_km, order.delivery_code.as_str()
        );
        self.send_mail(&customer.email, &subject, &body).await;

        self.notify(
            actor.id,
            Some(order.id),
            format!("Order #{} created successfully", order.id.simple()),
            NotificationKind::OrderCreated,
        )
        .await;

        Ok(order)
    }

    /// Courier-driven status progression. Target equal to the current
    /// status is an idempotent no-op; anything outside the adjacency
    /// table is rejected naming both states. The `delivered` target
    /// additionally demands the delivery confirmation code, on this
    /// path and on `complete_delivery` alike.
    pub async fn update_status(
        &self,
        actor: AuthUser,
        order_id: Uuid,
        target: OrderStatus,
        code: Option<&str>,
    ) -> Result<Order, OrderError> {
        if actor.role != UserRole::Courier {
            return Err(OrderError::authorization("access denied: courier only"));
        }
        let mut order = self.require_order(order_id).await?;
        if order.courier_id != Some(actor.id) {
            return Err(OrderError::authorization("this order is not assigned to you"));
        }

        if order.status == target {
            return Ok(order);
        }
        if !order.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition { from: order.status, to: target });
        }
        if target == OrderStatus::Delivered {
            let supplied = code.ok_or_else(|| OrderError::validation("delivery code is required"))?;
            if !order.delivery_code.matches(supplied) {
                return Err(OrderError::validation("invalid delivery code"));
            }
        }

        let now = Utc::now();
        let stamps = TransitionStamps::entering(target, now);
        let applied = self
            .orders
            .transition_status(order_id, order.status, target, stamps)
            .await
            .map_err(OrderError::storage)?;
        if !applied {
            return Err(OrderError::conflict(format!(
                "order was updated concurrently while in {}",
                order.status
            )));
        }

        tracing::info!(order = %order_id, courier = %actor.id, from = %order.status, to = %target, "order status updated");
        order.status = target;
        order.updated_at = now;
        if let Some(t) = stamps.picked_up_at {
            order.picked_up_at = Some(t);
        }
        if let Some(t) = stamps.delivered_at {
            order.delivered_at = Some(t);
        }

        self.emit_status_side_effects(&order, target).await;
        Ok(order)
    }

    /// Delivery confirmation endpoint: the `in_transit` → `delivered`
    /// transition gated on the stored code.
    pub async fn complete_delivery(&self, actor: AuthUser, order_id: Uuid, code: &str) -> Result<Order, OrderError> {
        self.update_status(actor, order_id, OrderStatus::Delivered, Some(code)).await
    }

    /// Admin assigns a courier to a pending order; courier and status
    /// flip in a single guarded write.
    pub async fn assign_courier(&self, actor: AuthUser, order_id: Uuid, courier_id: Uuid) -> Result<Order, OrderError> {
        if actor.role != UserRole::Admin {
            return Err(OrderError::authorization("access denied: admin only"));
        }
        let mut order = self.require_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::conflict(format!(
                "can only assign a courier while pending (current status: {})",
                order.status
            )));
        }
        let courier = self
            .users
            .get_active_courier(courier_id)
            .await
            .map_err(OrderError::storage)?
            .ok_or(OrderError::NotFound("active courier"))?;

        let applied = self.orders.assign_courier(order_id, courier.id).await.map_err(OrderError::storage)?;
        if !applied {
            return Err(OrderError::conflict("order is no longer pending"));
        }

        tracing::info!(order = %order_id, courier = %courier.id, admin = %actor.id, "courier assigned");
        order.courier_id = Some(courier.id);
        order.status = OrderStatus::Assigned;
        order.updated_at = Utc::now();

        self.notify(
            courier.id,
            Some(order.id),
            format!("You have been assigned order #{}", order.id.simple()),
            NotificationKind::Assignment,
        )
        .await;
        self.notify(
            order.customer_id,
            Some(order.id),
            format!("Courier assigned to your order #{}", order.id.simple()),
            NotificationKind::Assignment,
        )
        .await;
        if let Some(customer) = self.users.get(order.customer_id).await.map_err(OrderError::storage)? {
            let (subject, body) = status_email(&order, OrderStatus::Assigned);
            self.send_mail(&customer.email, &subject, &body).await;
        }

        Ok(order)
    }

    /// Admin escape hatch: set any status directly, bypassing the
    /// adjacency table. Logged distinctly from courier transitions.
    pub async fn force_status(&self, actor: AuthUser, order_id: Uuid, target: OrderStatus) -> Result<Order, OrderError> {
        if actor.role != UserRole::Admin {
            return Err(OrderError::authorization("access denied: admin only"));
        }
        let mut order = self.require_order(order_id).await?;
        if order.status == target {
            return Ok(order);
        }

        let now = Utc::now();
        let stamps = TransitionStamps::entering(target, now);
        let found = self.orders.force_status(order_id, target, stamps).await.map_err(OrderError::storage)?;
        if !found {
            return Err(OrderError::NotFound("order"));
        }

        tracing::warn!(
            admin = %actor.id,
            order = %order_id,
            from = %order.status,
            to = %target,
            "admin forced order status outside the transition table"
        );
        if order.courier_id.is_none() && !matches!(target, OrderStatus::Pending | OrderStatus::Cancelled) {
            tracing::warn!(order = %order_id, to = %target, "forced status leaves order without a courier");
        }

        order.status = target;
        order.updated_at = now;
        if let Some(t) = stamps.picked_up_at {
            order.picked_up_at = Some(t);
        }
        if let Some(t) = stamps.delivered_at {
            order.delivered_at = Some(t);
        }

        self.emit_status_side_effects(&order, target).await;
        Ok(order)
    }

    /// Customer rewrites the destination while the order is pending;
    /// distance and price are recomputed, falling back to the previous
    /// distance when re-resolution fails.
    pub async fn change_destination(
        &self,
        actor: AuthUser,
        order_id: Uuid,
        req: ChangeDestinationRequest,
    ) -> Result<Order, OrderError> {
        let mut order = self.require_order(order_id).await?;
        if order.customer_id != actor.id {
            return Err(OrderError::authorization("access denied"));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::conflict("can only change destination before pickup"));
        }
        if req.destination_address.trim().is_empty() {
            return Err(OrderError::validation("destination_address is required"));
        }
        if let Some(c) = req.destination_coords {
            if !c.is_valid() {
                return Err(OrderError::validation("invalid coordinates"));
            }
        }

        let destination_coords = self.resolve_coords(req.destination_coords, &req.destination_address).await;
        let routed = match (order.pickup_coords, destination_coords) {
            (Some(p), Some(d)) if p == d => Some(0.0),
            (Some(p), Some(d)) => self.routes.route(p, d).await.map(|est| est.distance_km),
            _ => None,
        };
        let distance_km = routed.or(order.distance_km);
        let price = pricing::quote(order.weight_kg, Some(distance_km.unwrap_or(DEFAULT_DISTANCE_KM)));

        let applied = self
            .orders
            .update_destination(order_id, req.destination_address.trim(), destination_coords, distance_km, price)
            .await
            .map_err(OrderError::storage)?;
        if !applied {
            return Err(OrderError::conflict("order is no longer pending"));
        }

        order.destination_address = req.destination_address.trim().to_string();
        order.destination_coords = destination_coords;
        order.distance_km = distance_km;
        order.price = price;
        order.updated_at = Utc::now();

        // Defensive: the pending guard should mean no courier yet.
        if let Some(courier_id) = order.courier_id {
            self.notify(
                courier_id,
                Some(order.id),
                format!("Destination changed for order #{}", order.id.simple()),
                NotificationKind::DestinationChanged,
            )
            .await;
        }

        Ok(order)
    }

    /// Customer cancels a pending order. Terminal status, not deletion.
    pub async fn cancel(&self, actor: AuthUser, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.require_order(order_id).await?;
        if order.customer_id != actor.id {
            return Err(OrderError::authorization("access denied"));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::conflict("can only cancel before pickup"));
        }

        let applied = self
            .orders
            .transition_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled, TransitionStamps::default())
            .await
            .map_err(OrderError::storage)?;
        if !applied {
            return Err(OrderError::conflict("order is no longer pending"));
        }

        tracing::info!(order = %order_id, customer = %actor.id, "order cancelled");
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.emit_status_side_effects(&order, OrderStatus::Cancelled).await;
        Ok(order)
    }

    /// Courier reports a live position for an order assigned to them.
    pub async fn update_location(&self, actor: AuthUser, order_id: Uuid, coords: Coordinates) -> Result<(), OrderError> {
        if actor.role != UserRole::Courier {
            return Err(OrderError::authorization("access denied: courier only"));
        }
        let order = self.require_order(order_id).await?;
        if order.courier_id != Some(actor.id) {
            return Err(OrderError::authorization("this order is not assigned to you"));
        }
        if !coords.is_valid() {
            return Err(OrderError::validation("invalid coordinates"));
        }
        self.orders.update_location(order_id, coords).await.map_err(OrderError::storage)?;
        Ok(())
    }

    /// Detail read with access scoping. The delivery code is visible
    /// only to the owning customer.
    pub async fn get_order(&self, actor: AuthUser, order_id: Uuid) -> Result<OrderAccess, OrderError> {
        let order = self.require_order(order_id).await?;
        let allowed = match actor.role {
            UserRole::Admin => true,
            UserRole::Customer => order.customer_id == actor.id,
            UserRole::Courier => order.courier_id == Some(actor.id),
        };
        if !allowed {
            return Err(OrderError::authorization("access denied"));
        }
        let include_delivery_code = actor.role == UserRole::Customer && order.customer_id == actor.id;
        Ok(OrderAccess { order, include_delivery_code })
    }

    /// Role-scoped listing: customers see their orders, couriers their
    /// assignments, admins everything (optionally narrowed by courier).
    pub async fn list_orders(
        &self,
        actor: AuthUser,
        status: Option<OrderStatus>,
        courier: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        let filter = match actor.role {
            UserRole::Customer => OrderFilter { customer_id: Some(actor.id), status, ..Default::default() },
            UserRole::Courier => OrderFilter { courier_id: Some(actor.id), status, ..Default::default() },
            UserRole::Admin => OrderFilter { courier_id: courier, status, ..Default::default() },
        };
        self.orders.list(filter, page).await.map_err(OrderError::storage)
    }

    pub async fn courier_stats(&self, actor: AuthUser) -> Result<CourierStats, OrderError> {
        if actor.role != UserRole::Courier {
            return Err(OrderError::authorization("access denied: courier only"));
        }
        self.orders.courier_stats(actor.id).await.map_err(OrderError::storage)
    }

    pub async fn dashboard(&self, actor: AuthUser) -> Result<DashboardStats, OrderError> {
        if actor.role != UserRole::Admin {
            return Err(OrderError::authorization("access denied: admin only"));
        }
        let status_counts = self.orders.status_counts().await.map_err(OrderError::storage)?;
        let total_orders = status_counts.values().sum();
        Ok(DashboardStats {
            total_users: self.users.count_by_role(None).await.map_err(OrderError::storage)?,
            total_customers: self.users.count_by_role(Some(UserRole::Customer)).await.map_err(OrderError::storage)?,
            total_couriers: self.users.count_by_role(Some(UserRole::Courier)).await.map_err(OrderError::storage)?,
            total_orders,
            status_counts,
            total_revenue: self.orders.revenue_total().await.map_err(OrderError::storage)?,
        })
    }

    /// Operational trend report: delivered revenue per day over the
    /// last thirty days, the current status distribution, and the five
    /// busiest couriers by completed deliveries.
    pub async fn reports(&self, actor: AuthUser) -> Result<OperationsReport, OrderError> {
        if actor.role != UserRole::Admin {
            return Err(OrderError::authorization("access denied: admin only"));
        }
        let since = Utc::now() - Duration::days(REPORT_WINDOW_DAYS);
        let revenue_trends = self.orders.revenue_by_day(since).await.map_err(OrderError::storage)?;
        let status_distribution = self.orders.status_counts().await.map_err(OrderError::storage)?;
        let leaders = self.orders.top_couriers(TOP_COURIER_LIMIT).await.map_err(OrderError::storage)?;

        let mut top_couriers = Vec::with_capacity(leaders.len());
        for CourierLeader { courier_id, deliveries } in leaders {
            let full_name = match self.users.get(courier_id).await.map_err(OrderError::storage)? {
                Some(courier) => courier.full_name,
                None => courier_id.to_string(),
            };
            top_couriers.push(CourierRanking { courier_id, full_name, deliveries });
        }

        Ok(OperationsReport { revenue_trends, status_distribution, top_couriers })
    }

    async fn require_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .await
            .map_err(OrderError::storage)?
            .ok_or(OrderError::NotFound("order"))
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User, OrderError> {
        self.users
            .get(user_id)
            .await
            .map_err(OrderError::storage)?
            .ok_or(OrderError::NotFound("user"))
    }

    async fn resolve_coords(&self, supplied: Option<Coordinates>, address: &str) -> Option<Coordinates> {
        match supplied {
            Some(c) => Some(c),
            None => self.geocoder.geocode(address).await,
        }
    }

    /// Exactly one customer notification and one email attempt per
    /// successful status change, whichever actor drove it.
    async fn emit_status_side_effects(&self, order: &Order, target: OrderStatus) {
        let (kind, message) = if target == OrderStatus::Delivered {
            (
                NotificationKind::OrderDelivered,
                format!("Order #{} has been delivered successfully!", order.id.simple()),
            )
        } else {
            (
                NotificationKind::StatusUpdate,
                format!("Your order #{} status changed to {}", order.id.simple(), target),
            )
        };
        self.notify(order.customer_id, Some(order.id), message, kind).await;

        match self.users.get(order.customer_id).await {
            Ok(Some(customer)) => {
                let (subject, body) = status_email(order, target);
                self.send_mail(&customer.email, &subject, &body).await;
            }
            Ok(None) => tracing::warn!(order = %order.id, "customer missing, skipping status email"),
            Err(e) => tracing::warn!(order = %order.id, error = %e, "customer lookup failed, skipping status email"),
        }
    }

    async fn notify(&self, user_id: Uuid, order_id: Option<Uuid>, message: String, kind: NotificationKind) {
        let record = Notification::new(user_id, order_id, message, kind);
        if let Err(e) = self.notifications.create(&record).await {
            tracing::warn!(user = %user_id, error = %e, "failed to record notification");
        }
    }

    async fn send_mail(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.mailer.send(to, subject, body, &[]).await {
            tracing::warn!(%to, error = %e, "failed to send email");
        }
    }
}

fn status_email(order: &Order, status: OrderStatus) -> (String, String) {
    let id = order.id.simple();
    let line = match status {
        OrderStatus::Assigned => format!("Your order #{id} has been assigned a courier."),
        OrderStatus::PickedUp => format!("Your order #{id} has been picked up by the courier."),
        OrderStatus::InTransit => format!("Your order #{id} is on its way!"),
        OrderStatus::Delivered => format!("Your order #{id} has been delivered successfully!"),
        OrderStatus::Cancelled => format!("Your order #{id} has been cancelled."),
        OrderStatus::Pending => format!("Your order #{id} status has been updated to: pending"),
    };
    (
        format!("Tuma - Order #{id} Status Update"),
        format!("<p>{line}</p><p>Parcel: {}</p>", order.parcel_name),
    )
}
