//! Favourites route handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use emporium_core::{ProductId, UserId};

use super::{OptionalJson, parse_id};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteForm {
    pub user_id: Option<UserId>,
}

#[instrument(skip(state, auth))]
pub async fn index(State(state): State<AppState>, auth: RequireAuth) -> Result<impl IntoResponse> {
    let favourites = state.favourites_ledger().list(auth.0).await?;
    Ok(Json(json!({ "favourites": favourites })))
}

#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse> {
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let favourite = state
        .favourites_ledger()
        .is_favourite(auth.0, product_id)
        .await?;
    Ok(Json(json!({ "favourite": favourite })))
}

/// Idempotent: adding an existing favourite answers the same message.
#[instrument(skip(state, auth, form))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<FavouriteForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    state.favourites_ledger().add(user_id, product_id).await?;
    Ok(Json(json!({ "message": "Product added to Favourites" })))
}

#[instrument(skip(state, auth, form))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<FavouriteForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    state.favourites_ledger().remove(user_id, product_id).await?;
    Ok(Json(json!({ "message": "Product removed from Favourites" })))
}
