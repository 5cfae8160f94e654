//! Registration, login and profile handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{Email, UserId};

use super::{ApiJson, parse_id};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, Favourites};
use crate::services::{Registration, ResolvedLine, Session};
use crate::state::AppState;

/// Registration body. Missing fields deserialize as empty and fail validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Token issued on registration and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user_id: UserId,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user_id: session.user_id,
        }
    }
}

/// A user's profile with their cart resolved to products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_name: String,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
    pub favourites: Favourites,
    pub cart: Vec<ResolvedLine>,
    pub created_at: DateTime<Utc>,
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<impl IntoResponse> {
    let (_, session) = state
        .auth_service()
        .register(&Registration {
            name: &form.name,
            email: &form.email,
            password: &form.password,
            confirm_password: &form.confirm_password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<impl IntoResponse> {
    let session = state
        .auth_service()
        .login(&form.email, &form.password)
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// Profile of the authenticated user. The path id must match the token.
#[instrument(skip(state, auth))]
pub async fn profile(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(Some(parse_id(&id, "user")?))?;

    let user = state
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    let cart = state.cart_ledger().resolve(&user.cart).await?;

    Ok(Json(ProfileResponse {
        user_name: user.user_name,
        email: user.email,
        first_name: user.profile.first_name,
        last_name: user.profile.last_name,
        phone_number: user.profile.phone_number,
        address: user.profile.address,
        favourites: user.favourites,
        cart,
        created_at: user.created_at,
    }))
}
