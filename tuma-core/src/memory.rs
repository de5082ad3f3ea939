//! In-memory trait implementations, used by the engine test suites and
//! as null adapters in unconfigured deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::identity::{User, UserRole};
use crate::mail::{EmailAttachment, MailError, Mailer};
use crate::notify::{Notification, NotificationRepository};
use crate::repository::{Page, PageRequest, RepoError, UserRepository};

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(users: Vec<User>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.users.lock().expect("user map poisoned");
            for user in users {
                map.insert(user.id, user);
            }
        }
        repo
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        self.users.lock().expect("user map poisoned").insert(user.id, user.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().expect("user map poisoned").get(&id).cloned())
    }

    async fn get_active_courier(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .lock()
            .expect("user map poisoned")
            .get(&id)
            .filter(|u| u.role == UserRole::Courier && u.is_active)
            .cloned())
    }

    async fn list(&self, role: Option<UserRole>, page: PageRequest) -> Result<Page<User>, RepoError> {
        let map = self.users.lock().expect("user map poisoned");
        let mut matched: Vec<User> = map
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(Page { items, total, page: page.page, per_page: page.per_page })
    }

    async fn toggle_active(&self, id: Uuid) -> Result<Option<bool>, RepoError> {
        let mut map = self.users.lock().expect("user map poisoned");
        Ok(map.get_mut(&id).map(|u| {
            u.is_active = !u.is_active;
            u.is_active
        }))
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: UserRole,
        vehicle_type: Option<String>,
        plate_number: Option<String>,
    ) -> Result<bool, RepoError> {
        let mut map = self.users.lock().expect("user map poisoned");
        match map.get_mut(&id) {
            Some(user) => {
                user.role = role;
                if let Some(v) = vehicle_type {
                    user.vehicle_type = Some(v);
                }
                if let Some(p) = plate_number {
                    user.plate_number = Some(p);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_by_role(&self, role: Option<UserRole>) -> Result<i64, RepoError> {
        let map = self.users.lock().expect("user map poisoned");
        Ok(map.values().filter(|u| role.map_or(true, |r| u.role == r)).count() as i64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    records: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.records.lock().expect("notification log poisoned").clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), RepoError> {
        self.records.lock().expect("notification log poisoned").push(notification.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, RepoError> {
        let mut matched: Vec<Notification> = self
            .records
            .lock()
            .expect("notification log poisoned")
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut records = self.records.lock().expect("notification log poisoned");
        match records.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Captures outbound mail for assertions. Flip `failing` to exercise
/// the swallow-and-log paths.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub failing: bool,
    sent: Mutex<Vec<SentEmail>>,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_names: Vec<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("outbox poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: &[EmailAttachment],
    ) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError("simulated provider outage".to_string()));
        }
        self.sent.lock().expect("outbox poisoned").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachment_names: attachments.iter().map(|a| a.filename.clone()).collect(),
        });
        Ok(())
    }
}
