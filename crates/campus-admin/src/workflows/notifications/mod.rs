//! Per-user notification inbox and live feed.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{NewNotification, Notification, NotificationId, NotificationKind};
pub use repository::NotificationRepository;
pub use router::notification_router;
pub use service::{NotificationService, NotificationServiceError, NotificationSubscription};
