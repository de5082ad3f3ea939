use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::repository::RepoError;

/// Polled, append-only notification record. Only the `is_read` flag
/// ever changes after creation, and only at the owner's request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, order_id: Option<Uuid>, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            order_id,
            message: message.into(),
            kind,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    StatusUpdate,
    Assignment,
    DestinationChanged,
    OrderDelivered,
    PaymentReceived,
    PaymentFailed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderCreated => "order_created",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::Assignment => "assignment",
            NotificationKind::DestinationChanged => "destination_changed",
            NotificationKind::OrderDelivered => "order_delivered",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::PaymentFailed => "payment_failed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_created" => Ok(NotificationKind::OrderCreated),
            "status_update" => Ok(NotificationKind::StatusUpdate),
            "assignment" => Ok(NotificationKind::Assignment),
            "destination_changed" => Ok(NotificationKind::DestinationChanged),
            "order_delivered" => Ok(NotificationKind::OrderDelivered),
            "payment_received" => Ok(NotificationKind::PaymentReceived),
            "payment_failed" => Ok(NotificationKind::PaymentFailed),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Append-only sink with per-user polling.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), RepoError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, RepoError>;

    /// Returns false when the notification does not exist or belongs to
    /// someone else.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
}
