//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login and bearer tokens
//! - `blob` - Product image bytes
//! - `cart` - Cart line mutations on the user aggregate
//! - `catalog` - Product listing, detail and maintenance
//! - `favourites` - Favourites toggles and the product popularity counter
//!
//! Services borrow the stores from [`crate::state::AppState`] for the length
//! of one request.

pub mod auth;
pub mod blob;
pub mod cart;
pub mod catalog;
pub mod favourites;

pub use auth::{AuthError, AuthService, Registration, Session, TokenAuthenticator};
pub use blob::{BlobError, BlobStore, FsBlobStore, MemoryBlobStore, validate_key};
pub use cart::{CartLedger, LedgerError, ResolvedLine};
pub use catalog::{CatalogError, CatalogService, ListingQuery, ProductPage, ProductView};
pub use favourites::FavouritesLedger;
