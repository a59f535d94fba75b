//! Error Types for the plotnav API
//!
//! `ApiError` is the structured error body returned by every route; each
//! `ErrorCode` maps to one HTTP status. Domain errors from the storage and
//! registry crates convert into API errors at the handler boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plotnav_core::{JobError, KeyFormatError, RegistryError, StoreError, SweepError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request contains invalid input data.
    InvalidInput,

    /// Required field is missing or empty.
    MissingField,

    /// The repository identifier is not in the configured set.
    RepositoryNotRegistered,

    /// The registry has no such collection.
    CollectionNotFound,

    /// No job exists with the requested id.
    JobNotFound,

    /// No cached summary exists for the requested key.
    SummaryNotFound,

    /// A cache key could not be parsed.
    MalformedCacheKey,

    /// The object store is unreachable.
    StoreUnavailable,

    /// The registry is unreachable.
    RegistryUnavailable,

    /// The build queue cannot accept more work right now.
    ServiceUnavailable,

    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField | ErrorCode::MalformedCacheKey => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::RepositoryNotRegistered
            | ErrorCode::CollectionNotFound
            | ErrorCode::JobNotFound
            | ErrorCode::SummaryNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StoreUnavailable
            | ErrorCode::RegistryUnavailable
            | ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("Required field missing or empty: {field}"))
    }

    pub fn repository_not_registered(repository: &str) -> Self {
        Self::new(
            ErrorCode::RepositoryNotRegistered,
            format!("Repository {repository:?} is not registered"),
        )
    }

    pub fn job_not_found(id: Uuid) -> Self {
        Self::new(ErrorCode::JobNotFound, format!("No job found with id {id}"))
    }

    pub fn summary_not_found(repository: &str, collection: &str) -> Self {
        Self::new(
            ErrorCode::SummaryNotFound,
            format!("No cached summary for collection {collection:?} in repository {repository:?}"),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Unavailable { .. } => Self::new(ErrorCode::StoreUnavailable, err.to_string()),
            StoreError::Payload { .. } => Self::internal_error(err.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match &err {
            RegistryError::CollectionNotFound { .. } => {
                Self::new(ErrorCode::CollectionNotFound, err.to_string())
            }
            RegistryError::UnknownRepository { repository } => {
                Self::repository_not_registered(repository)
            }
            RegistryError::Unavailable { .. } => {
                Self::new(ErrorCode::RegistryUnavailable, err.to_string())
            }
        }
    }
}

impl From<KeyFormatError> for ApiError {
    fn from(err: KeyFormatError) -> Self {
        Self::new(ErrorCode::MalformedCacheKey, err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match &err {
            JobError::NotFound { id } => Self::job_not_found(*id),
            JobError::QueueClosed | JobError::QueueFull => {
                Self::new(ErrorCode::ServiceUnavailable, err.to_string())
            }
            JobError::InvalidTransition { .. } => Self::internal_error(err.to_string()),
        }
    }
}

impl From<SweepError> for ApiError {
    fn from(err: SweepError) -> Self {
        match err {
            SweepError::Store(e) => e.into(),
            SweepError::Registry(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes_map_to_404() {
        for code in [
            ErrorCode::RepositoryNotRegistered,
            ErrorCode::CollectionNotFound,
            ErrorCode::JobNotFound,
            ErrorCode::SummaryNotFound,
        ] {
            assert_eq!(code.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn transient_codes_map_to_503() {
        for code in [
            ErrorCode::StoreUnavailable,
            ErrorCode::RegistryUnavailable,
            ErrorCode::ServiceUnavailable,
        ] {
            assert_eq!(code.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[test]
    fn collection_not_found_converts_to_404_body() {
        let api: ApiError = RegistryError::CollectionNotFound {
            collection: "gone".to_string(),
        }
        .into();
        assert_eq!(api.code, ErrorCode::CollectionNotFound);
        assert!(api.message.contains("gone"));
    }

    #[test]
    fn error_code_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::SummaryNotFound).unwrap(),
            "\"SUMMARY_NOT_FOUND\""
        );
    }
}
