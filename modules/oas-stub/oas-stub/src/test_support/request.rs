//! Fluent request builder for integration tests.

use axum::body::Body;
use http::header::HeaderMap;
use http::{HeaderName, HeaderValue, Method};
use tower::ServiceExt;

use super::harness::AppHarness;
use super::response::TestResponse;

/// Fluent HTTP request builder tied to an [`AppHarness`].
pub struct RequestCase<'a> {
    harness: &'a AppHarness,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Body>,
}

impl<'a> RequestCase<'a> {
    pub(crate) fn new(harness: &'a AppHarness, method: Method, path: impl Into<String>) -> Self {
        Self {
            harness,
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// JSON body with `content-type: application/json`.
    pub fn with_json(mut self, value: &serde_json::Value) -> Self {
        let bytes = serde_json::to_vec(value).expect("failed to serialize JSON body");
        self.body = Some(Body::from(bytes));
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Raw body; set the content type separately.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).expect("valid header value"),
        );
        self
    }

    fn into_request(self) -> (http::Request<Body>, axum::Router) {
        let mut builder = http::Request::builder().method(self.method).uri(&self.path);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let body = self.body.unwrap_or_else(Body::empty);
        let request = builder.body(body).expect("failed to build request");
        (request, self.harness.router().clone())
    }

    /// Send the request and return the collected response.
    pub async fn send(self) -> TestResponse {
        let (request, router) = self.into_request();
        let response = router
            .oneshot(request)
            .await
            .expect("router returned error");
        TestResponse::from_response(response).await
    }

    /// Send the request and return the raw response, body not yet consumed.
    pub async fn send_raw(self) -> http::Response<Body> {
        let (request, router) = self.into_request();
        router
            .oneshot(request)
            .await
            .expect("router returned error")
    }

    /// Send and assert the expected status code, returning the response for
    /// further assertions.
    pub async fn expect_status(self, status: u16) -> TestResponse {
        let resp = self.send().await;
        resp.assert_status(status);
        resp
    }
}
