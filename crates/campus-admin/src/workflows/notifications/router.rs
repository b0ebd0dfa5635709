use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream;
use serde::Deserialize;
use serde_json::json;

use super::domain::NotificationId;
use super::repository::NotificationRepository;
use super::service::{NotificationService, NotificationServiceError};
use crate::workflows::http::{
    access_status, authenticate, authenticate_query, error_response, repository_status,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotificationListQuery {
    #[serde(default)]
    pub(crate) unread_only: bool,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Router builder exposing the caller's notification inbox and live feed.
pub fn notification_router<N>(service: Arc<NotificationService<N>>) -> Router
where
    N: NotificationRepository + 'static,
{
    Router::new()
        .route("/api/v1/notifications", get(list_handler::<N>))
        .route(
            "/api/v1/notifications/unread-count",
            get(unread_count_handler::<N>),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(mark_all_read_handler::<N>),
        )
        .route(
            "/api/v1/notifications/stream",
            get(stream_handler::<N>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<N>),
        )
        .with_state(service)
}

pub(crate) fn notification_error_response(error: NotificationServiceError) -> Response {
    let status = match &error {
        NotificationServiceError::Access(error) => access_status(error),
        NotificationServiceError::Repository(error) => repository_status(error),
    };
    error_response(status, error)
}

pub(crate) async fn list_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    headers: HeaderMap,
    query: Result<Query<NotificationListQuery>, QueryRejection>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let (actor, query) = match authenticate_query(&headers, query) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    match service.list(&actor, query.unread_only, query.limit) {
        Ok(notifications) => (StatusCode::OK, axum::Json(notifications)).into_response(),
        Err(error) => notification_error_response(error),
    }
}

pub(crate) async fn unread_count_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    headers: HeaderMap,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.unread_count(&actor) {
        Ok(unread) => (StatusCode::OK, axum::Json(json!({ "unread": unread }))).into_response(),
        Err(error) => notification_error_response(error),
    }
}

pub(crate) async fn mark_read_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.mark_read(&actor, &NotificationId(notification_id)) {
        Ok(notification) => (StatusCode::OK, axum::Json(notification)).into_response(),
        Err(error) => notification_error_response(error),
    }
}

pub(crate) async fn mark_all_read_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    headers: HeaderMap,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.mark_all_read(&actor) {
        Ok(updated) => (StatusCode::OK, axum::Json(json!({ "updated": updated }))).into_response(),
        Err(error) => notification_error_response(error),
    }
}

/// Server-sent events carrying each new notification as JSON.
pub(crate) async fn stream_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    headers: HeaderMap,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let subscription = service.subscribe(&actor);
    let events = stream::unfold(subscription, |mut subscription| async move {
        let notification = subscription.next().await?;
        let event = Event::default()
            .event(notification.kind.label())
            .id(notification.id.0.clone())
            .json_data(&notification)
            .unwrap_or_else(|_| Event::default().event("error").data("unserializable"));
        Some((Ok::<_, Infallible>(event), subscription))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}
