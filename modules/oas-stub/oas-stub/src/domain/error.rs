use super::repo::RepositoryError;
use super::validation::ValidationResult;

/// Engine errors surfaced by the stub pipeline and the registration service.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{detail}")]
    NotFound { detail: String, instance: String },

    #[error("{detail}")]
    MethodNotAllowed { detail: String, instance: String },

    #[error("{detail}")]
    Validation {
        detail: String,
        instance: String,
        result: Option<ValidationResult>,
    },

    #[error("connection reset by stub configuration")]
    ConnectionReset { instance: String },

    #[error("request cancelled")]
    Cancelled { instance: String },

    #[error("invalid definition: {detail}")]
    InvalidDefinition { detail: String },

    #[error("internal: {message}")]
    Internal { message: String },
}

impl DomainError {
    #[must_use]
    pub fn not_found(detail: impl Into<String>, instance: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn method_not_allowed(method: &str, instance: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            detail: format!("method {method} is not declared for this path"),
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
            instance: String::new(),
            result: None,
        }
    }

    #[must_use]
    pub fn invalid_definition(detail: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn cancelled(instance: impl Into<String>) -> Self {
        Self::Cancelled {
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status reported for this error, to clients and in metrics.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::NotFound { .. } => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation { .. } | Self::InvalidDefinition { .. } => {
                http::StatusCode::BAD_REQUEST
            }
            Self::ConnectionReset { .. } | Self::Cancelled { .. } | Self::Internal { .. } => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Request path the error refers to, empty when unknown.
    #[must_use]
    pub fn instance(&self) -> &str {
        match self {
            Self::NotFound { instance, .. }
            | Self::MethodNotAllowed { instance, .. }
            | Self::Validation { instance, .. }
            | Self::ConnectionReset { instance }
            | Self::Cancelled { instance } => instance,
            Self::InvalidDefinition { .. } | Self::Internal { .. } => "",
        }
    }
}

// ---------------------------------------------------------------------------
// From<RepositoryError>
// ---------------------------------------------------------------------------

impl From<RepositoryError> for DomainError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(name) => Self::NotFound {
                detail: format!("application '{name}' is not registered"),
                instance: String::new(),
            },
            RepositoryError::Conflict(detail) => Self::InvalidDefinition { detail },
            RepositoryError::Internal(message) => Self::Internal { message },
        }
    }
}
