//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Store connectivity
//!
//! # Catalog
//! GET    /api/products?orderby&pagenum&search&category - Paginated listing
//! POST   /api/products                         - Create product
//! GET    /api/products/sample?count=n          - Random sample
//! GET    /api/products/{id}                    - Product detail (auth)
//! PATCH  /api/products/{id}                    - Partial update
//! DELETE /api/products/{id}                    - Delete
//! GET    /api/categories                       - Category list
//!
//! # Users
//! POST   /api/users/register                   - Register, returns token
//! POST   /api/users/login                      - Login, returns token
//! GET    /api/users/profile/{userId}           - Profile with resolved cart (auth)
//!
//! # Cart (auth)
//! GET    /api/users/cart/{userId}              - Resolved cart
//! PATCH  /api/users/cart/add/{productId}       - Add or grow a line
//! PATCH  /api/users/cart/increment/{productId} - Grow an existing line
//! PATCH  /api/users/cart/decrement/{productId} - Shrink a line, stopping at 1
//! DELETE /api/users/cart/{productId}           - Remove a line
//!
//! # Favourites (auth)
//! GET    /api/users/favourites                 - Favourite product ids
//! GET    /api/users/favourites/{productId}     - Membership check
//! PATCH  /api/users/favourites/add/{productId} - Add favourite
//! PATCH  /api/users/favourites/remove/{productId} - Remove favourite
//! ```

pub mod cart;
pub mod favourites;
pub mod health;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Request},
    middleware,
    routing::{get, patch, post},
};
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use emporium_core::IdParseError;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// JSON body extractor whose rejections use the `{message}` error shape.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}

/// JSON body that may be absent entirely; an empty body yields `T::default()`.
///
/// Cart and favourites mutations are usually sent with no body at all.
#[derive(Debug)]
pub struct OptionalJson<T>(pub T);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
    }
}

/// Parse a path segment into a typed id.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = IdParseError>,
{
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {what} id")))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/sample", get(products::sample))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::destroy),
        )
}

/// Create the user, cart and favourites routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/profile/{id}", get(users::profile))
        // Cart: GET takes the user id, DELETE takes the product id
        .route("/cart/{id}", get(cart::show).delete(cart::remove))
        .route("/cart/add/{product_id}", patch(cart::add))
        .route("/cart/increment/{product_id}", patch(cart::increment))
        .route("/cart/decrement/{product_id}", patch(cart::decrement))
        // Favourites
        .route("/favourites", get(favourites::index))
        .route("/favourites/{product_id}", get(favourites::show))
        .route("/favourites/add/{product_id}", patch(favourites::add))
        .route("/favourites/remove/{product_id}", patch(favourites::remove))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api/products", product_routes())
        .route("/api/categories", get(products::categories))
        .nest("/api/users", user_routes())
}

/// Build the complete application router with its middleware stack.
///
/// Sentry layers are added by the binary on top of this.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(CorsLayer::very_permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
