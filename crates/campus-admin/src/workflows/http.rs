//! Response helpers shared by the workflow routers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::access::{actor_from_headers, AccessError, Actor};
use crate::workflows::storage::RepositoryError;

pub(crate) fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    let payload = json!({ "error": message.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn access_status(error: &AccessError) -> StatusCode {
    if error.is_unauthenticated() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::FORBIDDEN
    }
}

pub(crate) fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Resolve the caller or produce the 401 response to return instead.
pub(crate) fn authenticate(headers: &HeaderMap) -> Result<Actor, Response> {
    actor_from_headers(headers).map_err(|error| error_response(access_status(&error), error))
}

/// Resolve the caller, then the JSON body. Identity failures win over body errors.
pub(crate) fn authenticate_json<T>(
    headers: &HeaderMap,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<(Actor, T), Response> {
    let actor = authenticate(headers)?;
    let Json(body) = payload
        .map_err(|rejection| error_response(rejection.status(), rejection.body_text()))?;
    Ok((actor, body))
}

/// Resolve the caller, then the query string.
pub(crate) fn authenticate_query<T>(
    headers: &HeaderMap,
    query: Result<Query<T>, QueryRejection>,
) -> Result<(Actor, T), Response> {
    let actor = authenticate(headers)?;
    let Query(params) = query
        .map_err(|rejection| error_response(rejection.status(), rejection.body_text()))?;
    Ok((actor, params))
}
