//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use emporium_core::{CategoryId, Price, ProductId};

use super::{ApiJson, parse_id};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{NewProduct, ProductPatch};
use crate::services::ListingQuery;
use crate::state::AppState;

/// Path the listing's next/previous links point at.
const LISTING_PATH: &str = "/api/products";

/// Sample size when `count` is not given.
const DEFAULT_SAMPLE: u32 = 4;

/// Listing query parameters, validated by the catalog service.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub orderby: Option<String>,
    pub pagenum: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SampleParams {
    pub count: Option<u32>,
}

/// Product creation body.
#[derive(Debug, Deserialize)]
pub struct CreateProductForm {
    pub name: String,
    pub category: Option<CategoryId>,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

/// Partial update body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductForm {
    pub name: Option<String>,
    pub category: Option<CategoryId>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let query = ListingQuery {
        orderby: params.orderby.as_deref(),
        pagenum: params.pagenum.as_deref(),
        search: params.search.as_deref(),
        category: params.category.as_deref(),
    };
    let page = state.catalog_service().list(LISTING_PATH, &query).await?;
    Ok(Json(page))
}

/// Random sample of products.
#[instrument(skip(state))]
pub async fn sample(
    State(state): State<AppState>,
    Query(params): Query<SampleParams>,
) -> Result<impl IntoResponse> {
    let products = state
        .catalog_service()
        .sample(params.count.unwrap_or(DEFAULT_SAMPLE))
        .await?;
    Ok(Json(products))
}

/// Product detail.
#[instrument(skip(state, _auth))]
pub async fn show(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog_service().get(id).await?;
    Ok(Json(product))
}

#[instrument(skip(state, form))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<CreateProductForm>,
) -> Result<impl IntoResponse> {
    let product = state
        .catalog_service()
        .create(NewProduct {
            name: form.name,
            category: form.category,
            price: form.price,
            description: form.description,
            image: form.image,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<UpdateProductForm>,
) -> Result<impl IntoResponse> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = state
        .catalog_service()
        .update(
            id,
            ProductPatch {
                name: form.name,
                category: form.category,
                price: form.price,
                description: form.description,
                image: form.image,
            },
        )
        .await?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id: ProductId = parse_id(&id, "product")?;
    state.catalog_service().delete(id).await?;
    Ok(Json(json!({ "message": "Product removed" })))
}

/// All categories, by name.
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = state.catalog_service().categories().await?;
    Ok(Json(categories))
}
