use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;
use tracing::error;

use crate::domain::error::DomainError;
use crate::domain::validation::PROBLEM_JSON;

// ---------------------------------------------------------------------------
// Problem types
// ---------------------------------------------------------------------------

pub(crate) const ERR_NOT_FOUND: &str = "not-found";
pub(crate) const ERR_METHOD_NOT_ALLOWED: &str = "method-not-allowed";
pub(crate) const ERR_VALIDATION: &str = "validation-error";
pub(crate) const ERR_INVALID_DEFINITION: &str = "invalid-definition";
pub(crate) const ERR_INTERNAL: &str = "internal-error";

/// `application/problem+json` body for errors without validation details.
#[derive(Debug, Serialize)]
struct Problem<'a> {
    #[serde(rename = "type")]
    problem_type: &'a str,
    title: &'a str,
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    instance: &'a str,
}

fn problem_type(err: &DomainError) -> &'static str {
    match err {
        DomainError::NotFound { .. } => ERR_NOT_FOUND,
        DomainError::MethodNotAllowed { .. } => ERR_METHOD_NOT_ALLOWED,
        DomainError::Validation { .. } => ERR_VALIDATION,
        DomainError::InvalidDefinition { .. } => ERR_INVALID_DEFINITION,
        DomainError::ConnectionReset { .. }
        | DomainError::Cancelled { .. }
        | DomainError::Internal { .. } => ERR_INTERNAL,
    }
}

fn error_title(err: &DomainError) -> &'static str {
    match err {
        DomainError::NotFound { .. } => "Not Found",
        DomainError::MethodNotAllowed { .. } => "Method Not Allowed",
        DomainError::Validation { .. } => "Validation error",
        DomainError::InvalidDefinition { .. } => "Invalid Definition",
        DomainError::ConnectionReset { .. } => "Connection Reset",
        DomainError::Cancelled { .. } => "Request Cancelled",
        DomainError::Internal { .. } => "Internal Server Error",
    }
}

fn problem_body(err: &DomainError, status: StatusCode) -> Vec<u8> {
    if let DomainError::Validation {
        result: Some(result),
        ..
    } = err
        && let Some(body) = result.to_problem_details(status.as_u16())
    {
        return body;
    }
    let problem = Problem {
        problem_type: problem_type(err),
        title: error_title(err),
        status: status.as_u16(),
        detail: err.to_string(),
        instance: err.instance(),
    };
    serde_json::to_vec(&problem).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Convenience functions for handlers
// ---------------------------------------------------------------------------

/// Convert a `DomainError` into an axum `Response` carrying a problem body.
pub fn error_response(err: DomainError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, instance = %err.instance(), "stub pipeline failed");
    }
    let body = problem_body(&err, status);
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
    response
}

/// 404 for a request naming no registered application.
pub fn not_found_response(path: &str) -> Response {
    error_response(DomainError::not_found(
        "no application is registered for this path",
        path,
    ))
}
