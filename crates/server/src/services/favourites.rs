//! Favourites toggles and the paired popularity counter.

use tracing::instrument;

use emporium_core::{ProductId, UserId};

use super::cart::LedgerError;
use crate::db::{FavouritesStore, ProductCatalog, RepositoryError, UserStore};
use crate::models::{Favourites, User};

/// Favourites operations for one request.
pub struct FavouritesLedger<'a> {
    users: &'a dyn UserStore,
    catalog: &'a dyn ProductCatalog,
    favourites: &'a dyn FavouritesStore,
}

fn map_store_error(err: RepositoryError) -> LedgerError {
    match err {
        RepositoryError::MissingReference("product") => LedgerError::ProductNotFound,
        RepositoryError::NotFound => LedgerError::UserNotFound,
        other => LedgerError::Repository(other),
    }
}

impl<'a> FavouritesLedger<'a> {
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        catalog: &'a dyn ProductCatalog,
        favourites: &'a dyn FavouritesStore,
    ) -> Self {
        Self {
            users,
            catalog,
            favourites,
        }
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        if self.users.exists(user_id).await? {
            Ok(())
        } else {
            Err(LedgerError::UserNotFound)
        }
    }

    async fn require_product(&self, product_id: ProductId) -> Result<(), LedgerError> {
        match self.catalog.get_by_id(product_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::ProductNotFound),
        }
    }

    /// Mark a product as a favourite. A no-op when it already is one.
    ///
    /// Returns `true` if membership changed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` / `LedgerError::ProductNotFound`
    /// for unknown ids.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, LedgerError> {
        self.require_user(user_id).await?;
        self.require_product(product_id).await?;

        let added = self
            .favourites
            .insert(user_id, product_id)
            .await
            .map_err(map_store_error)?;
        tracing::debug!(added, "favourite add");
        Ok(added)
    }

    /// Drop a product from the favourites. A no-op when it is not one.
    ///
    /// Returns `true` if membership changed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` for an unknown user.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, LedgerError> {
        self.require_user(user_id).await?;

        let removed = self
            .favourites
            .remove(user_id, product_id)
            .await
            .map_err(map_store_error)?;
        tracing::debug!(removed, "favourite remove");
        Ok(removed)
    }

    /// Whether the product is one of the user's favourites.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` for an unknown user.
    pub async fn is_favourite(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, LedgerError> {
        Ok(self.load_user(user_id).await?.favourites.contains(product_id))
    }

    /// All of the user's favourites.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` for an unknown user.
    pub async fn list(&self, user_id: UserId) -> Result<Favourites, LedgerError> {
        Ok(self.load_user(user_id).await?.favourites)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{Email, Price};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, NewUser};

    async fn user(store: &MemoryStore, email: &str) -> UserId {
        UserStore::create(
            store,
            &NewUser {
                user_name: "Fav".into(),
                email: Email::parse(email).unwrap(),
            },
            "hash",
        )
        .await
        .unwrap()
        .id
    }

    async fn product(store: &MemoryStore) -> ProductId {
        ProductCatalog::create(
            store,
            &NewProduct {
                name: "Vase".into(),
                category: None,
                price: Price::from_cents(1200).unwrap(),
                description: String::new(),
                image: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn count(store: &MemoryStore, id: ProductId) -> u64 {
        ProductCatalog::get_by_id(store, id)
            .await
            .unwrap()
            .unwrap()
            .favourites_count
    }

    #[tokio::test]
    async fn test_add_twice_counts_once() {
        let store = MemoryStore::new();
        let u = user(&store, "one@example.com").await;
        let p = product(&store).await;
        let ledger = FavouritesLedger::new(&store, &store, &store);

        assert!(ledger.add(u, p).await.unwrap());
        assert!(!ledger.add(u, p).await.unwrap());
        assert_eq!(count(&store, p).await, 1);
        assert!(ledger.is_favourite(u, p).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_state() {
        let store = MemoryStore::new();
        let u = user(&store, "two@example.com").await;
        let p = product(&store).await;
        let ledger = FavouritesLedger::new(&store, &store, &store);

        ledger.add(u, p).await.unwrap();
        ledger.remove(u, p).await.unwrap();
        assert_eq!(count(&store, p).await, 0);
        assert!(!ledger.is_favourite(u, p).await.unwrap());
        assert!(ledger.list(u).await.unwrap().is_empty());

        // Removing again leaves the counter at zero
        assert!(!ledger.remove(u, p).await.unwrap());
        assert_eq!(count(&store, p).await, 0);
    }

    #[tokio::test]
    async fn test_counter_tracks_distinct_users() {
        let store = MemoryStore::new();
        let p = product(&store).await;
        let ledger = FavouritesLedger::new(&store, &store, &store);

        let a = user(&store, "a@example.com").await;
        let b = user(&store, "b@example.com").await;
        ledger.add(a, p).await.unwrap();
        ledger.add(b, p).await.unwrap();
        ledger.add(a, p).await.unwrap();
        assert_eq!(count(&store, p).await, 2);

        ledger.remove(a, p).await.unwrap();
        assert_eq!(count(&store, p).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let store = MemoryStore::new();
        let u = user(&store, "three@example.com").await;
        let p = product(&store).await;
        let ledger = FavouritesLedger::new(&store, &store, &store);

        assert!(matches!(
            ledger.add(u, ProductId::generate()).await,
            Err(LedgerError::ProductNotFound)
        ));
        assert!(matches!(
            ledger.add(UserId::generate(), p).await,
            Err(LedgerError::UserNotFound)
        ));
        assert!(matches!(
            ledger.remove(UserId::generate(), p).await,
            Err(LedgerError::UserNotFound)
        ));
        assert_eq!(count(&store, p).await, 0);
        assert!(ledger.list(u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_exists() {
        let store = MemoryStore::new();
        let u = user(&store, "four@example.com").await;

        assert!(UserStore::exists(&store, u).await.unwrap());
        assert!(!UserStore::exists(&store, UserId::generate()).await.unwrap());

        store.set_fail_on_read(true).await;
        assert!(UserStore::exists(&store, u).await.is_err());
    }
}
