//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::{FavouritesStore, ProductCatalog, Stores, UserStore};
use crate::services::{
    AuthService, BlobStore, CartLedger, CatalogService, FavouritesLedger, TokenAuthenticator,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out per-request
/// services borrowing the shared stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    blobs: Arc<dyn BlobStore>,
    tokens: TokenAuthenticator,
    page_size: u32,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `stores` - User, catalog and favourites stores
    /// * `blobs` - Product image storage
    /// * `tokens` - Bearer token issuer/verifier
    /// * `page_size` - Products per listing page
    #[must_use]
    pub fn new(
        stores: Stores,
        blobs: Arc<dyn BlobStore>,
        tokens: TokenAuthenticator,
        page_size: u32,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                stores,
                blobs,
                tokens,
                page_size,
            }),
        }
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.stores.users.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn ProductCatalog {
        self.inner.stores.catalog.as_ref()
    }

    #[must_use]
    pub fn favourites(&self) -> &dyn FavouritesStore {
        self.inner.stores.favourites.as_ref()
    }

    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    /// Get a reference to the bearer token authenticator.
    #[must_use]
    pub fn tokens(&self) -> &TokenAuthenticator {
        &self.inner.tokens
    }

    #[must_use]
    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(self.users(), self.tokens())
    }

    #[must_use]
    pub fn catalog_service(&self) -> CatalogService<'_> {
        CatalogService::new(self.catalog(), self.blobs(), self.inner.page_size)
    }

    #[must_use]
    pub fn cart_ledger(&self) -> CartLedger<'_> {
        CartLedger::new(self.users(), self.catalog(), self.blobs())
    }

    #[must_use]
    pub fn favourites_ledger(&self) -> FavouritesLedger<'_> {
        FavouritesLedger::new(self.users(), self.catalog(), self.favourites())
    }
}
