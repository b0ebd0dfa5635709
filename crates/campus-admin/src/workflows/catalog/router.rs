use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use super::domain::{NewCareer, NewCycle, NewProfessor, NewStudent, NewSubject};
use super::repository::CatalogRepository;
use super::service::{CatalogService, CatalogServiceError};
use crate::workflows::http::{
    access_status, authenticate, authenticate_json, error_response, repository_status,
};

/// Router builder exposing tenant catalog endpoints.
pub fn catalog_router<C>(service: Arc<CatalogService<C>>) -> Router
where
    C: CatalogRepository + 'static,
{
    Router::new()
        .route("/api/v1/institution", get(institution_handler::<C>))
        .route(
            "/api/v1/careers",
            get(list_careers_handler::<C>).post(create_career_handler::<C>),
        )
        .route(
            "/api/v1/cycles",
            get(list_cycles_handler::<C>).post(create_cycle_handler::<C>),
        )
        .route(
            "/api/v1/professors",
            get(list_professors_handler::<C>).post(create_professor_handler::<C>),
        )
        .route(
            "/api/v1/subjects",
            get(list_subjects_handler::<C>).post(create_subject_handler::<C>),
        )
        .route(
            "/api/v1/students",
            get(list_students_handler::<C>).post(create_student_handler::<C>),
        )
        .route(
            "/api/v1/students/import",
            post(import_students_handler::<C>),
        )
        .with_state(service)
}

pub(crate) fn catalog_error_response(error: CatalogServiceError) -> Response {
    let status = catalog_status(&error);
    error_response(status, error)
}

fn catalog_status(error: &CatalogServiceError) -> StatusCode {
    match error {
        CatalogServiceError::Access(error) => access_status(error),
        CatalogServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogServiceError::Validation(_)
        | CatalogServiceError::UnknownReference(_)
        | CatalogServiceError::Roster(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogServiceError::ImportRow { source, .. } => catalog_status(source),
        CatalogServiceError::Repository(error) => repository_status(error),
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CatalogServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => catalog_error_response(error),
    }
}

pub(crate) async fn institution_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.institution(&actor)),
        Err(response) => response,
    }
}

pub(crate) async fn create_career_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewCareer>, JsonRejection>,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate_json(&headers, payload) {
        Ok((actor, input)) => respond(StatusCode::CREATED, service.create_career(&actor, input)),
        Err(response) => response,
    }
}

pub(crate) async fn list_careers_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.careers(&actor)),
        Err(response) => response,
    }
}

pub(crate) async fn create_cycle_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewCycle>, JsonRejection>,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate_json(&headers, payload) {
        Ok((actor, input)) => respond(StatusCode::CREATED, service.create_cycle(&actor, input)),
        Err(response) => response,
    }
}

pub(crate) async fn list_cycles_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.cycles(&actor)),
        Err(response) => response,
    }
}

pub(crate) async fn create_professor_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewProfessor>, JsonRejection>,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate_json(&headers, payload) {
        Ok((actor, input)) => respond(StatusCode::CREATED, service.create_professor(&actor, input)),
        Err(response) => response,
    }
}

pub(crate) async fn list_professors_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.professors(&actor)),
        Err(response) => response,
    }
}

pub(crate) async fn create_subject_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewSubject>, JsonRejection>,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate_json(&headers, payload) {
        Ok((actor, input)) => respond(StatusCode::CREATED, service.create_subject(&actor, input)),
        Err(response) => response,
    }
}

pub(crate) async fn list_subjects_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.subjects(&actor)),
        Err(response) => response,
    }
}

pub(crate) async fn create_student_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    payload: Result<axum::Json<NewStudent>, JsonRejection>,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate_json(&headers, payload) {
        Ok((actor, input)) => respond(StatusCode::CREATED, service.create_student(&actor, input)),
        Err(response) => response,
    }
}

pub(crate) async fn list_students_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.students(&actor)),
        Err(response) => response,
    }
}

/// Accepts the roster as a raw CSV body.
pub(crate) async fn import_students_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    C: CatalogRepository + 'static,
{
    match authenticate(&headers) {
        Ok(actor) => respond(
            StatusCode::CREATED,
            service.import_students(&actor, body.as_bytes()),
        ),
        Err(response) => response,
    }
}
