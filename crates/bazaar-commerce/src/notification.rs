//! In-app notifications.

use bazaar_db::{Db, Document, Filter, FindOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CommerceError, CommerceResult};
use crate::ids::{NotificationId, UserId};
use crate::validate;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Order,
    Promotion,
    System,
    Account,
}

/// A message shown to one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: NotificationId,
    pub user: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Notification {
    pub fn new(
        user: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user,
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            link: None,
            created_at: crate::timestamp::now(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
}

impl NotificationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, mut notification: Notification) -> CommerceResult<Notification> {
        notification.title = validate::required(&notification.title, "Please add a title")?;
        notification.message = validate::required(&notification.message, "Please add a message")?;
        validate::max_len(&notification.title, MAX_TITLE_LEN, "Title")?;
        validate::max_len(&notification.message, MAX_MESSAGE_LEN, "Message")?;

        self.db.insert(&notification).await?;
        debug!(user = %notification.user, kind = ?notification.kind, "Notification created");
        Ok(notification)
    }

    /// A user's notifications, newest first.
    pub async fn list_for(&self, user: &UserId, unread_only: bool) -> CommerceResult<Vec<Notification>> {
        let mut filter = Filter::new().eq("user", user);
        if unread_only {
            filter = filter.eq("isRead", false);
        }
        Ok(self
            .db
            .find(&filter, &FindOptions::new().sort_by("-createdAt,-_id"))
            .await?)
    }

    /// Mark one of the user's notifications read.
    pub async fn mark_read(&self, user: &UserId, id: &str) -> CommerceResult<Notification> {
        self.db
            .update::<Notification, _, CommerceError, _>(id, |n| {
                if &n.user != user {
                    return Err(CommerceError::not_found("Notification", id));
                }
                n.is_read = true;
                Ok(n.clone())
            })
            .await?
            .ok_or_else(|| CommerceError::not_found("Notification", id))
    }

    /// Mark every unread notification of a user read. Returns how many changed.
    pub async fn mark_all_read(&self, user: &UserId) -> CommerceResult<usize> {
        let unread = self.list_for(user, true).await?;
        for n in &unread {
            self.db
                .update::<Notification, _, CommerceError, _>(n.id.as_str(), |n| {
                    n.is_read = true;
                    Ok(())
                })
                .await?;
        }
        Ok(unread.len())
    }

    pub async fn delete(&self, user: &UserId, id: &str) -> CommerceResult<()> {
        let owned = self
            .db
            .exists::<Notification>(&Filter::new().eq("_id", id).eq("user", user))
            .await?;
        if !owned || !self.db.delete_by_id::<Notification>(id).await? {
            return Err(CommerceError::not_found("Notification", id));
        }
        Ok(())
    }
}
