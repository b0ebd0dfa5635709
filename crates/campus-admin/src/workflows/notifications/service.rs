use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::domain::{NewNotification, Notification, NotificationId};
use super::repository::NotificationRepository;
use crate::access::{AccessError, Actor, InstitutionId, UserId};
use crate::config::NotificationConfig;
use crate::workflows::next_sequence_id;
use crate::workflows::storage::RepositoryError;

static NOTIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Persists notifications and fans each new row out to live subscribers.
pub struct NotificationService<N> {
    repository: Arc<N>,
    feed: broadcast::Sender<Notification>,
}

impl<N> NotificationService<N>
where
    N: NotificationRepository + 'static,
{
    pub fn new(repository: Arc<N>, config: &NotificationConfig) -> Self {
        let (feed, _) = broadcast::channel(config.feed_capacity.max(1));
        Self { repository, feed }
    }

    /// Insert the row, then publish it. A missing audience is not an error.
    pub fn emit(&self, new: NewNotification) -> Result<Notification, NotificationServiceError> {
        let notification = Notification {
            id: NotificationId(next_sequence_id("ntf", &NOTIFICATION_SEQUENCE)),
            institution_id: new.institution_id,
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            enrollment_request_id: new.enrollment_request_id,
            is_read: false,
            created_at: Utc::now(),
        };

        let stored = self.repository.insert(notification)?;
        info!(
            notification = %stored.id,
            institution = %stored.institution_id,
            user = %stored.user_id,
            kind = stored.kind.label(),
            "notification emitted"
        );

        if let Ok(receivers) = self.feed.send(stored.clone()) {
            debug!(receivers, "notification published to live feed");
        }

        Ok(stored)
    }

    pub fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, NotificationServiceError> {
        Ok(self
            .repository
            .list_for_user(&actor.institution_id, &actor.user_id, unread_only, limit)?)
    }

    pub fn unread_count(&self, actor: &Actor) -> Result<usize, NotificationServiceError> {
        Ok(self
            .repository
            .list_for_user(&actor.institution_id, &actor.user_id, true, None)?
            .len())
    }

    /// Only the recipient may mark a notification read. Rows of another
    /// institution read as missing.
    pub fn mark_read(
        &self,
        actor: &Actor,
        id: &NotificationId,
    ) -> Result<Notification, NotificationServiceError> {
        let notification = self
            .repository
            .fetch(id)?
            .filter(|notification| notification.institution_id == actor.institution_id)
            .ok_or(RepositoryError::NotFound)?;

        if notification.user_id != actor.user_id {
            warn!(notification = %id, user = %actor.user_id, "mark-read attempted by non-recipient");
            return Err(AccessError::Forbidden(format!(
                "notification {id} belongs to another user"
            ))
            .into());
        }

        if notification.is_read {
            return Ok(notification);
        }

        Ok(self.repository.mark_read(id)?)
    }

    pub fn mark_all_read(&self, actor: &Actor) -> Result<usize, NotificationServiceError> {
        Ok(self
            .repository
            .mark_all_read(&actor.institution_id, &actor.user_id)?)
    }

    /// Live stream of the caller's notifications created after this call.
    pub fn subscribe(&self, actor: &Actor) -> NotificationSubscription {
        NotificationSubscription {
            institution_id: actor.institution_id.clone(),
            user_id: actor.user_id.clone(),
            receiver: self.feed.subscribe(),
        }
    }
}

/// Receiver half of the live feed, filtered to a single user of one institution.
pub struct NotificationSubscription {
    institution_id: InstitutionId,
    user_id: UserId,
    receiver: broadcast::Receiver<Notification>,
}

impl NotificationSubscription {
    /// Waits for the next notification addressed to this user.
    ///
    /// Messages dropped while lagging are skipped. Returns `None` once the
    /// service is gone.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification)
                    if notification.is_addressed_to(&self.institution_id, &self.user_id) =>
                {
                    return Some(notification)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user = %self.user_id, skipped, "notification subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Error raised by the notification service.
#[derive(Debug, thiserror::Error)]
pub enum NotificationServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
