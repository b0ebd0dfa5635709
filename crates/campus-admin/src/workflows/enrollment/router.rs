use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{
    CancelInput, EnrollmentQuery, EnrollmentRequestId, NewEnrollmentRequest, ReviewDecision,
    ReviewInput,
};
use super::repository::EnrollmentRepository;
use super::service::{EnrollmentService, EnrollmentServiceError};
use crate::workflows::catalog::router::catalog_error_response;
use crate::workflows::catalog::{CatalogRepository, StudentId};
use crate::workflows::http::{
    access_status, authenticate, authenticate_json, authenticate_query, error_response,
    repository_status,
};
use crate::workflows::notifications::router::notification_error_response;
use crate::workflows::notifications::NotificationRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

type SharedService<R, C, N> = Arc<EnrollmentService<R, C, N>>;

/// Router builder exposing the enrollment request lifecycle.
pub fn enrollment_router<R, C, N>(service: SharedService<R, C, N>) -> Router
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/enrollment-requests",
            get(list_handler::<R, C, N>).post(submit_handler::<R, C, N>),
        )
        .route(
            "/api/v1/enrollment-requests/:request_id",
            get(get_handler::<R, C, N>),
        )
        .route(
            "/api/v1/enrollment-requests/:request_id/review",
            post(review_handler::<R, C, N>),
        )
        .route(
            "/api/v1/enrollment-requests/:request_id/cancel",
            post(cancel_handler::<R, C, N>),
        )
        .route(
            "/api/v1/students/:student_id/subjects",
            get(enrolled_subjects_handler::<R, C, N>),
        )
        .with_state(service)
}

pub(crate) fn enrollment_error_response(error: EnrollmentServiceError) -> Response {
    match error {
        EnrollmentServiceError::Catalog(error) => catalog_error_response(error),
        EnrollmentServiceError::Notification(error) => notification_error_response(error),
        other => {
            let status = match &other {
                EnrollmentServiceError::Access(error) => access_status(error),
                EnrollmentServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EnrollmentServiceError::AlreadyEnrolled { .. }
                | EnrollmentServiceError::Transition(_) => StatusCode::CONFLICT,
                EnrollmentServiceError::Repository(error) => repository_status(error),
                EnrollmentServiceError::Catalog(_) | EnrollmentServiceError::Notification(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            error_response(status, other)
        }
    }
}

pub(crate) async fn submit_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewEnrollmentRequest>, JsonRejection>,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let (actor, input) = match authenticate_json(&headers, payload) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    match service.submit(&actor, input) {
        Ok(request) => (StatusCode::CREATED, axum::Json(request)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn list_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    query: Result<Query<EnrollmentQuery>, QueryRejection>,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let (actor, query) = match authenticate_query(&headers, query) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    match service.list(&actor, query) {
        Ok(requests) => (StatusCode::OK, axum::Json(requests)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn get_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.get(&actor, &EnrollmentRequestId(request_id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn review_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    payload: Result<axum::Json<ReviewPayload>, JsonRejection>,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let (actor, payload) = match authenticate_json(&headers, payload) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };

    let input = ReviewInput {
        admin_notes: payload.admin_notes,
    };
    match service.review(
        &actor,
        &EnrollmentRequestId(request_id),
        payload.decision,
        input,
    ) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

/// The body is optional; an empty POST cancels without notes.
pub(crate) async fn cancel_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    body: axum::body::Bytes,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let input = if body.is_empty() {
        CancelInput::default()
    } else {
        match serde_json::from_slice::<CancelInput>(&body) {
            Ok(input) => input,
            Err(error) => return error_response(StatusCode::BAD_REQUEST, error),
        }
    };

    match service.cancel(&actor, &EnrollmentRequestId(request_id), input) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn enrolled_subjects_handler<R, C, N>(
    State(service): State<SharedService<R, C, N>>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
) -> Response
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.enrolled_subjects(&actor, &StudentId(student_id)) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}
