use super::domain::{Notification, NotificationId};
use crate::access::{InstitutionId, UserId};
use crate::workflows::storage::RepositoryError;

/// Storage abstraction for notification rows, keyed by institution and user.
pub trait NotificationRepository: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError>;
    fn fetch(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError>;
    /// Newest first. `limit` of `None` returns everything.
    fn list_for_user(
        &self,
        institution_id: &InstitutionId,
        user_id: &UserId,
        unread_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, RepositoryError>;
    /// Flags the row read and returns it; already-read rows are returned unchanged.
    fn mark_read(&self, id: &NotificationId) -> Result<Notification, RepositoryError>;
    /// Returns how many rows changed.
    fn mark_all_read(
        &self,
        institution_id: &InstitutionId,
        user_id: &UserId,
    ) -> Result<usize, RepositoryError>;
}
