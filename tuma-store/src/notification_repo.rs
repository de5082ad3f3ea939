use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tuma_core::notify::{Notification, NotificationKind, NotificationRepository};
use tuma_core::repository::RepoError;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Option<Uuid>,
    message: String,
    kind: String,
    is_read: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification, RepoError> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            order_id: self.order_id,
            message: self.message,
            kind: self.kind.parse::<NotificationKind>().map_err(RepoError::from)?,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, order_id, message, kind, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.order_id)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, RepoError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, user_id, order_id, message, kind, is_read, created_at
             FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(NotificationRow::into_notification).collect()
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
