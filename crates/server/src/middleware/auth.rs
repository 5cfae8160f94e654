//! Bearer token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use emporium_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// Rejects with 401 `{"message": "Invalid token"}` otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user_id): RequireAuth) -> String {
///     format!("Hello, {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub UserId);

impl RequireAuth {
    /// Fail unless `claimed` (a user id from the body or path) is absent or
    /// names the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityMismatch` when the ids differ.
    pub fn ensure_same_user(self, claimed: Option<UserId>) -> Result<UserId, AppError> {
        match claimed {
            Some(claimed) if claimed != self.0 => {
                tracing::warn!(token_user = %self.0, %claimed, "identity mismatch");
                Err(AuthError::IdentityMismatch.into())
            }
            _ => Ok(self.0),
        }
    }
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::InvalidToken)?;

        let user_id = state.tokens().verify(token)?;
        set_sentry_user(&user_id);
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        Ok(Self(user_id))
    }
}
