use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ApiResponse;
use crate::models::PageError;
use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced to HTTP clients.
///
/// The `Display` text is the client-facing message. Storage detail is kept in
/// the `Storage` variant for logging and never rendered.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("{0}")]
    InvalidInput(String),
    #[error("not found")]
    NotFound,
    #[error("alias already exists")]
    Conflict,
    #[error("unauthorized")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("internal error")]
    Storage(anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render with an explicit status, used by the redirect path which keeps
    /// HTTP 200 for error bodies unless configured otherwise
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        if let AppError::Storage(ref err) = self {
            tracing::error!(error = ?err, "storage failure");
        }
        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AppError::NotFound,
            StorageError::Conflict => AppError::Conflict,
            StorageError::Other(err) => AppError::Storage(err),
        }
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.into_response_with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_leaked() {
        let err = AppError::from(StorageError::Other(anyhow::anyhow!("disk I/O error")));
        assert_eq!(err.to_string(), "internal error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_taxonomy_maps_one_to_one() {
        assert!(matches!(AppError::from(StorageError::NotFound), AppError::NotFound));
        assert!(matches!(AppError::from(StorageError::Conflict), AppError::Conflict));
        assert_eq!(AppError::NotFound.to_string(), "not found");
        assert_eq!(AppError::InvalidRequest.to_string(), "invalid request");
    }

    #[test]
    fn page_errors_name_the_parameter() {
        let err = AppError::from(PageError::InvalidLength);
        assert_eq!(err.to_string(), "Invalid 'length' parameter");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
