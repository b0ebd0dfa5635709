use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{InstitutionId, UserId};
use crate::workflows::enrollment::EnrollmentRequestId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EnrollmentApproved,
    EnrollmentRejected,
    EnrollmentCancelled,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::EnrollmentApproved => "enrollment_approved",
            NotificationKind::EnrollmentRejected => "enrollment_rejected",
            NotificationKind::EnrollmentCancelled => "enrollment_cancelled",
        }
    }
}

/// A message delivered to one user of one institution, written as a side effect of a request decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub institution_id: InstitutionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub enrollment_request_id: Option<EnrollmentRequestId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub institution_id: InstitutionId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub enrollment_request_id: Option<EnrollmentRequestId>,
}

impl Notification {
    /// Whether the row belongs to `user_id` within `institution_id`.
    pub fn is_addressed_to(&self, institution_id: &InstitutionId, user_id: &UserId) -> bool {
        &self.institution_id == institution_id && &self.user_id == user_id
    }
}
