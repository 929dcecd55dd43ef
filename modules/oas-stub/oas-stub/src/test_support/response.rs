//! Collected stub response with assertions on status, headers, synthesized
//! bodies and problem details.

use axum::body::Body;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;

use crate::domain::validation::PROBLEM_JSON;

pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    /// Collect the whole body. Panics on bodies that fail mid-stream; use
    /// `RequestCase::send_raw` for connection-reset responses.
    pub async fn from_response(resp: http::Response<Body>) -> Self {
        let (parts, body) = resp.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("stub response body failed while collecting")
            .to_vec();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    // -- Assertions --

    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "expected status {expected}, got {}. Body: {}",
            self.status.as_u16(),
            String::from_utf8_lossy(&self.body),
        );
        self
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(name)
            .unwrap_or_else(|| panic!("header '{name}' missing"))
            .to_str()
            .unwrap_or_else(|_| panic!("header '{name}' is not visible ASCII"));
        assert_eq!(actual, expected, "header '{name}'");
        self
    }

    pub fn assert_body_contains(&self, needle: &str) -> &Self {
        let text = String::from_utf8_lossy(&self.body);
        assert!(text.contains(needle), "body lacks '{needle}': {text}");
        self
    }

    /// `application/problem+json` body whose `type` is `problem_type` and
    /// whose `status` repeats the response status.
    pub fn assert_problem(&self, problem_type: &str) -> &Self {
        self.assert_header(CONTENT_TYPE.as_str(), PROBLEM_JSON);
        let body = self.json();
        assert_eq!(body["type"], problem_type, "problem body: {body}");
        assert_eq!(body["status"], self.status.as_u16(), "problem body: {body}");
        self
    }

    /// Validation problem listing `name` with `reason` among its errors.
    pub fn assert_validation_error(&self, name: &str, reason: &str) -> &Self {
        self.assert_problem("validation-error");
        let body = self.json();
        let listed = body["errors"].as_array().is_some_and(|errors| {
            errors
                .iter()
                .any(|e| e["name"] == name && e["reason"] == reason)
        });
        assert!(listed, "no error {name}: {reason} in {body}");
        self
    }

    // -- Accessors --

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("stub body is not UTF-8")
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("stub body is not JSON")
    }
}
