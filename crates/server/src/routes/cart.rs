//! Cart route handlers.
//!
//! Every handler acts on the user named by the bearer token. A `userId` in
//! the body or path is accepted for client compatibility and must match it.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use emporium_core::{ProductId, Quantity, UserId};

use super::{OptionalJson, parse_id};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::LedgerError;
use crate::state::AppState;

/// Optional body of the cart mutations.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartForm {
    pub user_id: Option<UserId>,
    /// Defaults to one.
    pub quantity: Option<u32>,
}

impl CartForm {
    fn quantity(&self) -> Result<Quantity> {
        let quantity = self
            .quantity
            .map(Quantity::new)
            .transpose()
            .map_err(LedgerError::from)?;
        Ok(quantity.unwrap_or(Quantity::ONE))
    }
}

/// The user's cart with products resolved.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(Some(parse_id(&id, "user")?))?;
    let cart = state.cart_ledger().get_cart(user_id).await?;
    Ok(Json(json!({ "cart": cart })))
}

#[instrument(skip(state, auth, form))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<CartForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    state
        .cart_ledger()
        .add_to_cart(user_id, product_id, form.quantity()?)
        .await?;
    Ok(Json(json!({ "message": "Product added to cart" })))
}

#[instrument(skip(state, auth, form))]
pub async fn increment(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<CartForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .cart_ledger()
        .increment_line(user_id, product_id, form.quantity()?)
        .await?;
    Ok(Json(json!({ "cart": cart })))
}

/// Shrink a line. The line never drops below one; use DELETE to remove it.
#[instrument(skip(state, auth, form))]
pub async fn decrement(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<CartForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    let cart = state
        .cart_ledger()
        .decrement_clamped(user_id, product_id, form.quantity()?)
        .await?;
    Ok(Json(json!({ "cart": cart })))
}

#[instrument(skip(state, auth, form))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<String>,
    OptionalJson(form): OptionalJson<CartForm>,
) -> Result<impl IntoResponse> {
    let user_id = auth.ensure_same_user(form.user_id)?;
    let product_id: ProductId = parse_id(&product_id, "product")?;
    state.cart_ledger().remove_line(user_id, product_id).await?;
    Ok(Json(json!({ "message": "Product removed from cart" })))
}
