//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response is a JSON object `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, BlobError, CatalogError, LedgerError};

/// Message sent for every server-side failure.
const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart or favourites operation failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Image read failed.
    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::MissingField(_)
                | AuthError::PasswordMismatch
                | AuthError::WeakPassword(_)
                | AuthError::UserAlreadyExists => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::IdentityMismatch => StatusCode::UNAUTHORIZED,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::MissingSort
                | CatalogError::InvalidSort(_)
                | CatalogError::InvalidCategory(_)
                | CatalogError::DuplicateCategory(_)
                | CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CatalogError::ProductNotFound | CatalogError::CategoryNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Repository(_) | CatalogError::Blob(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Ledger(err) => match err {
                LedgerError::UserNotFound
                | LedgerError::ProductNotFound
                | LedgerError::LineNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::Quantity(_) => StatusCode::BAD_REQUEST,
                LedgerError::Repository(_) | LedgerError::Blob(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        if self.status().is_server_error() {
            // Don't expose internal error details to clients
            return SERVER_ERROR_MESSAGE.to_owned();
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_owned(),
                AuthError::InvalidToken | AuthError::ExpiredToken => "Invalid token".to_owned(),
                AuthError::IdentityMismatch => "Invalid token: identity mismatch".to_owned(),
                AuthError::PasswordMismatch => {
                    "confirm password does not match password".to_owned()
                }
                AuthError::UserAlreadyExists => "User already exists".to_owned(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::WeakPassword(msg) => msg.clone(),
                other => other.to_string(),
            },
            Self::Catalog(err) => err.to_string(),
            Self::Ledger(err) => err.to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        (status, Json(json!({ "message": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{ProductId, QuantityError, SortError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(BlobError::NotFound("lamp.png".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(CatalogError::InvalidSort(SortError("bogus".into())).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(LedgerError::LineNotFound(ProductId::generate()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(LedgerError::Quantity(QuantityError::Zero).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::IdentityMismatch.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_server_error_body_is_generic() {
        let body = get_body(AppError::Database(RepositoryError::DataCorruption(
            "secret detail".into(),
        )))
        .await;
        assert_eq!(body, json!({ "message": "Server error" }));
    }

    #[tokio::test]
    async fn test_client_error_body_carries_message() {
        let body = get_body(CatalogError::MissingSort.into()).await;
        assert_eq!(body, json!({ "message": "Invalid orderby parameter" }));

        let body = get_body(LedgerError::LineNotFound(ProductId::generate()).into()).await;
        assert_eq!(body, json!({ "message": "Product not found in cart" }));
    }
}
