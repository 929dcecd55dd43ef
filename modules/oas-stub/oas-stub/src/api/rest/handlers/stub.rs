use std::io;

use axum::body::Body;
use axum::extract::{Extension, Request};
use axum::response::Response;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode, header};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::rest::error::{error_response, not_found_response};
use crate::domain::error::DomainError;
use crate::domain::services::{StubOutcome, StubRequest, StubResponse};
use crate::module::AppState;

/// Stub handler for every path under the configured prefix.
///
/// Enforces the body size limit, hands the request to the stub service and
/// turns its outcome into a response. Dropping the handler future (client
/// disconnect) cancels the request.
pub async fn stub_handler(
    Extension(state): Extension<AppState>,
    req: Request,
) -> Result<Response, Response> {
    let max_body_size = state.config.max_body_size_bytes;
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_owned();

    if let Some(cl) = parts.headers.get(header::CONTENT_LENGTH) {
        let cl_val: usize = cl
            .to_str()
            .ok()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                error_response(DomainError::Validation {
                    detail: "invalid Content-Length header".to_owned(),
                    instance: path.clone(),
                    result: None,
                })
            })?;
        if cl_val > max_body_size {
            return Err(error_response(DomainError::Validation {
                detail: format!(
                    "request body of {cl_val} bytes exceeds maximum of {max_body_size} bytes"
                ),
                instance: path,
                result: None,
            }));
        }
    }

    // A body that cannot be read counts as no body.
    let body_bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .unwrap_or_else(|e| {
            debug!(path = %path, error = %e, "request body unreadable, treating as empty");
            Bytes::new()
        });

    let request = StubRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body: oas_stub_sdk::Body::from(body_bytes),
    };

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let outcome = state.stub.handle(request, cancel).await;
    guard.disarm();

    match outcome.map_err(error_response)? {
        StubOutcome::Response(response) => Ok(into_response(response)),
        StubOutcome::Aborted => Ok(reset_response()),
        StubOutcome::NotFound => Err(not_found_response(&path)),
    }
}

fn into_response(stub: StubResponse) -> Response {
    let Some(status) = StatusCode::from_u16(stub.status)
        .ok()
        .filter(|_| (100..=599).contains(&stub.status))
    else {
        debug!(status = stub.status, "status outside the HTTP range, dropping connection");
        return reset_response();
    };

    let mut response = Response::new(Body::from_stream(stub.body.into_stream()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, values) in &stub.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!(header = %name, "skipping invalid response header name");
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => warn!(header = %name, "skipping invalid response header value"),
            }
        }
    }
    if let Some(content_type) = stub.content_type
        && let Ok(value) = HeaderValue::from_str(&content_type)
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Response whose body fails at once, so the transport drops the connection.
fn reset_response() -> Response {
    let stream = futures_util::stream::once(async {
        Err::<Bytes, io::Error>(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by stub configuration",
        ))
    });
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
