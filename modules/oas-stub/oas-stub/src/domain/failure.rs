use oas_stub_sdk::{ApiFailure, ResponseContext};

/// Status emitted for `protocol-error`; outside the HTTP range on purpose.
pub const PROTOCOL_ERROR_STATUS: u16 = 1000;

/// What the failure check does with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// No failure configured; continue with delay and latency.
    Proceed(ResponseContext),
    /// Emit this response now, skipping delay and latency.
    ShortCircuit(ResponseContext),
    /// Drop the connection without a response.
    Reset,
}

/// `connection-reset` can be decided before any synthesis.
#[must_use]
pub fn resets_connection(failure: ApiFailure) -> bool {
    matches!(failure, ApiFailure::ConnectionReset)
}

#[must_use]
pub fn inject_failure(failure: ApiFailure, response: ResponseContext) -> FailureOutcome {
    match failure {
        ApiFailure::None => FailureOutcome::Proceed(response),
        ApiFailure::ProtocolError => {
            FailureOutcome::ShortCircuit(ResponseContext::new(PROTOCOL_ERROR_STATUS))
        }
        ApiFailure::HttpStatus { status } => FailureOutcome::ShortCircuit(ResponseContext {
            status,
            content: None,
            content_type: None,
            headers: response.headers,
        }),
        ApiFailure::ConnectionReset => FailureOutcome::Reset,
    }
}
