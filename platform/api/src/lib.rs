use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use serde::Serialize;
use thiserror::Error;

/// Shared GraphQL result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("login required")]
    Unauthenticated,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("AI service error")]
    AiService(Arc<anyhow::Error>),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

/// Stable machine-readable code carried in `extensions.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthenticated,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    LimitExceeded,
    AiService,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::LimitExceeded => "LIMIT_EXCEEDED",
            ErrorCode::AiService => "AI_SERVICE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthenticated => ErrorCode::Unauthenticated,
            ApiError::Forbidden => ErrorCode::Forbidden,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Validation(_) => ErrorCode::Validation,
            ApiError::Conflict(_) => ErrorCode::Conflict,
            ApiError::LimitExceeded(_) => ErrorCode::LimitExceeded,
            ApiError::AiService(_) => ErrorCode::AiService,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    pub fn ai_service(err: anyhow::Error) -> Self {
        Self::AiService(Arc::new(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        match self {
            ApiError::Internal(inner) => tracing::error!(error = ?inner, "internal error"),
            ApiError::AiService(inner) => tracing::warn!(error = %inner, "AI flow failed"),
            _ => {}
        }
        Error::new(self.to_string()).extend_with(|_err, e| {
            e.set("code", self.code().as_str());
        })
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

/// Field-level validation failure.
pub fn validation_error(message: impl Into<String>) -> Error {
    ApiError::validation(message).extend()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    fn code_of(err: &Error) -> Option<Value> {
        err.extensions
            .as_ref()
            .and_then(|map| map.get("code"))
            .cloned()
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        assert_eq!(code_of(&err), Some(Value::from("INTERNAL")));
    }

    #[test]
    fn ai_failures_are_generic() {
        let err = ApiError::ai_service(anyhow::anyhow!("reply missing field `score`")).extend();
        assert_eq!(err.message, "AI service error");
        assert_eq!(code_of(&err), Some(Value::from("AI_SERVICE")));
    }

    #[test]
    fn validation_messages_pass_through() {
        let err = validation_error("email is required");
        assert_eq!(err.message, "email is required");
        assert_eq!(code_of(&err), Some(Value::from("VALIDATION")));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = ApiError::NotFound("employee").extend();
        assert_eq!(err.message, "employee not found");
        assert_eq!(code_of(&err), Some(Value::from("NOT_FOUND")));
    }
}
