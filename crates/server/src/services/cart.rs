//! Cart mutations on the user aggregate.
//!
//! Every mutation loads the user's whole cart, applies one [`Cart`] method and
//! writes the cart back. Two concurrent mutations by the same user race and the
//! later save wins; a single save is atomic.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use emporium_core::{ProductId, Quantity, QuantityError, UserId};

use super::blob::{BlobError, BlobStore};
use super::catalog::ProductView;
use crate::db::{ProductCatalog, RepositoryError, UserStore};
use crate::models::{Cart, CartError, User};

/// Errors from cart and favourites operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Product not found in cart")]
    LineNotFound(ProductId),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

impl From<CartError> for LedgerError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound(product) => Self::LineNotFound(product),
            CartError::Quantity(e) => Self::Quantity(e),
        }
    }
}

impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::UserNotFound,
            RepositoryError::MissingReference("product") => Self::ProductNotFound,
            other => Self::Repository(other),
        }
    }
}

/// A cart line with its product resolved for display.
#[derive(Debug, Serialize)]
pub struct ResolvedLine {
    pub product: ProductView,
    pub quantity: Quantity,
}

/// Cart operations for one request.
pub struct CartLedger<'a> {
    users: &'a dyn UserStore,
    catalog: &'a dyn ProductCatalog,
    blobs: &'a dyn BlobStore,
}

impl<'a> CartLedger<'a> {
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        catalog: &'a dyn ProductCatalog,
        blobs: &'a dyn BlobStore,
    ) -> Self {
        Self {
            users,
            catalog,
            blobs,
        }
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)
    }

    /// Load, mutate and save the user's cart.
    async fn mutate<T>(
        &self,
        user_id: UserId,
        apply: impl FnOnce(&mut Cart) -> Result<T, CartError> + Send,
    ) -> Result<(T, Cart), LedgerError> {
        let mut cart = self.load_user(user_id).await?.cart;
        let outcome = apply(&mut cart)?;
        self.users.save_cart(user_id, &cart).await?;
        Ok((outcome, cart))
    }

    /// Add `quantity` of a product, growing its line or appending a new one.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` / `LedgerError::ProductNotFound`
    /// for unknown ids and `LedgerError::Quantity` on overflow.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, LedgerError> {
        if self.catalog.get_by_id(product_id).await?.is_none() {
            return Err(LedgerError::ProductNotFound);
        }
        let (total, _) = self
            .mutate(user_id, |cart| cart.add(product_id, quantity))
            .await?;
        tracing::debug!(%total, "cart line grown");
        Ok(total)
    }

    /// Grow an existing line.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn increment_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, LedgerError> {
        let (_, cart) = self
            .mutate(user_id, |cart| cart.increment(product_id, quantity))
            .await?;
        Ok(cart)
    }

    /// Shrink an existing line, stopping at one.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::LineNotFound` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn decrement_clamped(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, LedgerError> {
        let (_, cart) = self
            .mutate(user_id, |cart| cart.decrement_clamped(product_id, quantity))
            .await?;
        Ok(cart)
    }

    /// Remove a line whatever its quantity.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::LineNotFound` if the product is not in the cart;
    /// the stored cart is left untouched.
    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, LedgerError> {
        let (_, cart) = self
            .mutate(user_id, |cart| cart.remove(product_id))
            .await?;
        Ok(cart)
    }

    /// The user's cart with products and images resolved.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` for an unknown user.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Vec<ResolvedLine>, LedgerError> {
        let user = self.load_user(user_id).await?;
        self.resolve(&user.cart).await
    }

    /// Resolve each line's product, in cart order.
    ///
    /// Lines whose product has vanished are skipped.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` / `LedgerError::Blob` on store failures.
    pub async fn resolve(&self, cart: &Cart) -> Result<Vec<ResolvedLine>, LedgerError> {
        let ids: Vec<ProductId> = cart.product_ids().collect();
        let mut products: HashMap<ProductId, _> = self
            .catalog
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut resolved = Vec::with_capacity(cart.len());
        for line in cart.lines() {
            let Some(product) = products.remove(&line.product_id) else {
                tracing::warn!(product_id = %line.product_id, "cart line references missing product");
                continue;
            };
            resolved.push(ResolvedLine {
                product: ProductView::load(self.blobs, product).await?,
                quantity: line.quantity,
            });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use emporium_core::{Email, Price};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, NewUser};
    use crate::services::blob::MemoryBlobStore;

    struct Fixture {
        store: MemoryStore,
        blobs: MemoryBlobStore,
        user: UserId,
        product: ProductId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let user = UserStore::create(
                &store,
                &NewUser {
                    user_name: "Cart".into(),
                    email: Email::parse("cart@example.com").unwrap(),
                },
                "hash",
            )
            .await
            .unwrap()
            .id;
            let product = ProductCatalog::create(
                &store,
                &NewProduct {
                    name: "Kettle".into(),
                    category: None,
                    price: Price::from_cents(3000).unwrap(),
                    description: String::new(),
                    image: None,
                },
            )
            .await
            .unwrap()
            .id;
            Self {
                store,
                blobs: MemoryBlobStore::new(),
                user,
                product,
            }
        }

        fn ledger(&self) -> CartLedger<'_> {
            CartLedger::new(&self.store, &self.store, &self.blobs)
        }

        async fn cart(&self) -> Cart {
            UserStore::get_by_id(&self.store, self.user)
                .await
                .unwrap()
                .unwrap()
                .cart
        }
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_add_twice_grows_single_line() {
        let fx = Fixture::new().await;
        let ledger = fx.ledger();

        ledger
            .add_to_cart(fx.user, fx.product, Quantity::ONE)
            .await
            .unwrap();
        let cart = fx.cart().await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(fx.product).unwrap().quantity, Quantity::ONE);

        let total = ledger
            .add_to_cart(fx.user, fx.product, Quantity::ONE)
            .await
            .unwrap();
        assert_eq!(total, qty(2));
        assert_eq!(fx.cart().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_product_or_user() {
        let fx = Fixture::new().await;
        let ledger = fx.ledger();

        assert!(matches!(
            ledger
                .add_to_cart(fx.user, ProductId::generate(), Quantity::ONE)
                .await,
            Err(LedgerError::ProductNotFound)
        ));
        assert!(matches!(
            ledger
                .add_to_cart(UserId::generate(), fx.product, Quantity::ONE)
                .await,
            Err(LedgerError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_decrement_clamps_and_keeps_line() {
        let fx = Fixture::new().await;
        let ledger = fx.ledger();
        ledger.add_to_cart(fx.user, fx.product, qty(2)).await.unwrap();

        let cart = ledger
            .decrement_clamped(fx.user, fx.product, qty(5))
            .await
            .unwrap();
        assert_eq!(cart.get(fx.product).unwrap().quantity, Quantity::ONE);
        assert_eq!(fx.cart().await, cart);
    }

    #[tokio::test]
    async fn test_increment_requires_line() {
        let fx = Fixture::new().await;
        let ledger = fx.ledger();

        assert!(matches!(
            ledger
                .increment_line(fx.user, fx.product, Quantity::ONE)
                .await,
            Err(LedgerError::LineNotFound(_))
        ));
        ledger
            .add_to_cart(fx.user, fx.product, Quantity::ONE)
            .await
            .unwrap();
        let cart = ledger
            .increment_line(fx.user, fx.product, qty(3))
            .await
            .unwrap();
        assert_eq!(cart.get(fx.product).unwrap().quantity, qty(4));
    }

    #[tokio::test]
    async fn test_remove_twice_is_line_not_found() {
        let fx = Fixture::new().await;
        let ledger = fx.ledger();
        ledger.add_to_cart(fx.user, fx.product, qty(7)).await.unwrap();

        let cart = ledger.remove_line(fx.user, fx.product).await.unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            ledger.remove_line(fx.user, fx.product).await,
            Err(LedgerError::LineNotFound(_))
        ));
        assert!(fx.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_cart_resolves_products_in_order() {
        let fx = Fixture::new().await;
        let second = ProductCatalog::create(
            &fx.store,
            &NewProduct {
                name: "Toaster".into(),
                category: None,
                price: Price::from_cents(4500).unwrap(),
                description: String::new(),
                image: Some("toaster.jpg".into()),
            },
        )
        .await
        .unwrap();
        fx.blobs.put("toaster.jpg", b"img".to_vec()).await;

        let ledger = fx.ledger();
        ledger.add_to_cart(fx.user, second.id, Quantity::ONE).await.unwrap();
        ledger.add_to_cart(fx.user, fx.product, qty(2)).await.unwrap();

        let lines = ledger.get_cart(fx.user).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product.product.id, second.id);
        assert_eq!(lines[0].product.image_data.as_deref(), Some("aW1n"));
        assert_eq!(lines[1].quantity, qty(2));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let fx = Fixture::new().await;
        fx.store.set_fail_on_write(true).await;
        let err = fx
            .ledger()
            .add_to_cart(fx.user, fx.product, Quantity::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Repository(_)));
    }
}
