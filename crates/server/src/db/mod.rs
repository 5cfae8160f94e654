//! Persistence for the catalog and user aggregates.
//!
//! # Database: `emporium`
//!
//! ## Tables
//!
//! - `category` - Product categories
//! - `product` - Catalog entries, including the denormalized `favourites_count`
//! - `app_user` - Accounts, profile fields and password hashes
//! - `cart_line` - One row per (user, product) with quantity and display position
//! - `favourite` - One row per (user, product) favourite
//!
//! # Store traits
//!
//! Handlers and services never touch SQL directly. They talk to the
//! [`UserStore`], [`ProductCatalog`] and [`FavouritesStore`] traits, which
//! have a `PostgreSQL` implementation (this module's submodules) and an
//! in-memory one ([`memory::MemoryStore`]) used by tests and local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

pub mod favourites;
pub mod memory;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::{CategoryId, Email, ProductId, ProductSort, UserId};

use crate::models::{Cart, Category, NewProduct, NewUser, Product, ProductFilter, ProductPatch, User};

pub use favourites::PgFavouritesStore;
pub use memory::MemoryStore;
pub use products::PgProductCatalog;
pub use users::PgUserStore;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A referenced entity (product, category, user) does not exist.
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a sqlx error, turning constraint violations into domain variants.
    pub(crate) fn from_constraint(err: sqlx::Error, reference: &'static str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(
                    db_err
                        .constraint()
                        .unwrap_or("unique constraint")
                        .to_owned(),
                );
            }
            if db_err.is_foreign_key_violation() {
                return Self::MissingReference(reference);
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store traits
// =============================================================================

/// Storage for the User aggregate (profile, credentials, cart, favourites).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with an empty cart and no favourites.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create(&self, user: &NewUser, password_hash: &str) -> Result<User, RepositoryError>;

    /// Load a user aggregate, including cart lines (in display order) and favourites.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Whether a user with this id exists, without loading the aggregate.
    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Look up the id and password hash registered for an email.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(UserId, String)>, RepositoryError>;

    /// Replace the user's whole cart with `cart`.
    ///
    /// The replacement is atomic for readers, but concurrent savers race:
    /// the last write wins. Returns `RepositoryError::NotFound` if the user is
    /// gone and `RepositoryError::MissingReference("product")` if a line
    /// points at a deleted product.
    async fn save_cart(&self, id: UserId, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Storage for products and categories.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Count products matching `filter`.
    async fn count(&self, filter: &ProductFilter) -> Result<u64, RepositoryError>;

    /// Fetch one page of products matching `filter` in `sort` order.
    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Up to `count` products in random order.
    async fn sample(&self, count: u32) -> Result<Vec<Product>, RepositoryError>;

    /// Fetch a product by id.
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch every listed product that still exists (order unspecified).
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product with a zero favourites counter.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply the supplied fields; `None` when the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product, dropping it from every cart and favourites set.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// All categories, by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Fetch a category by id.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Create a category. Returns `RepositoryError::Conflict` for a duplicate name.
    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Favourites membership paired with the product's `favourites_count`.
///
/// Implementations must change membership and counter together: the counter
/// moves only when the membership row was actually inserted or deleted, so
/// repeated or concurrent calls can never double count.
#[async_trait]
pub trait FavouritesStore: Send + Sync {
    /// Add `product` to the user's favourites.
    ///
    /// Returns `true` if it was not already a favourite.
    async fn insert(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError>;

    /// Remove `product` from the user's favourites.
    ///
    /// Returns `true` if it was a favourite.
    async fn remove(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError>;
}

/// The set of stores a running server talks to.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub favourites: Arc<dyn FavouritesStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            catalog: Arc::new(PgProductCatalog::new(pool.clone())),
            favourites: Arc::new(PgFavouritesStore::new(pool.clone())),
        }
    }

    /// Stores backed by a single in-memory store.
    #[must_use]
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            favourites: store,
        }
    }
}
