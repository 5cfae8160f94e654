//! In-memory store implementing every store trait.
//!
//! Backs the service and router tests. All state sits behind one lock, so
//! favourites membership and counters always move together.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;

use emporium_core::{CategoryId, Email, ProductId, ProductSort, UserId};

use super::{FavouritesStore, ProductCatalog, RepositoryError, UserStore};
use crate::models::{
    Cart, Category, Favourites, NewProduct, NewUser, Product, ProductFilter, ProductPatch,
    Profile, User,
};

struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct State {
    users: HashMap<UserId, StoredUser>,
    emails: HashMap<Email, UserId>,
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_on_write: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

fn unavailable() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail as if the database were unreachable.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Make every read fail as if the database were unreachable.
    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    async fn check_write(&self) -> Result<(), RepositoryError> {
        if *self.fail_on_write.read().await {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn check_read(&self) -> Result<(), RepositoryError> {
        if *self.fail_on_read.read().await {
            return Err(unavailable());
        }
        Ok(())
    }
}

fn sort_products(products: &mut [Product], sort: ProductSort) {
    match sort {
        ProductSort::Random => products.sort_by_key(|p| p.id),
        ProductSort::Price => products.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
        ProductSort::Created => {
            products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        }
        ProductSort::Favourites => products.sort_by(|a, b| {
            b.favourites_count
                .cmp(&a.favourites_count)
                .then(a.id.cmp(&b.id))
        }),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &NewUser, password_hash: &str) -> Result<User, RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if state.emails.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("app_user_email_key".into()));
        }

        let created = User {
            id: UserId::generate(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            profile: Profile::default(),
            cart: Cart::default(),
            favourites: Favourites::default(),
            created_at: Utc::now(),
        };
        state.emails.insert(created.email.clone(), created.id);
        state.users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        self.check_read().await?;
        Ok(self.state.read().await.users.contains_key(&id))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(UserId, String)>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .map(|stored| (stored.user.id, stored.password_hash.clone())))
    }

    async fn save_cart(&self, id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if cart
            .product_ids()
            .any(|product| !state.products.contains_key(&product))
        {
            return Err(RepositoryError::MissingReference("product"));
        }
        let stored = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.cart = cart.clone();
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn count(&self, filter: &ProductFilter) -> Result<u64, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        let count = state.products.values().filter(|p| filter.matches(p)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        let mut matching: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_products(&mut matching, sort);

        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn sample(&self, count: u32) -> Result<Vec<Product>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        let mut all: Vec<Product> = state.products.values().cloned().collect();
        all.shuffle(&mut rand::rng());
        all.truncate(usize::try_from(count).unwrap_or(usize::MAX));
        Ok(all)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check_read().await?;
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let category = match product.category {
            Some(id) => Some(
                state
                    .categories
                    .get(&id)
                    .cloned()
                    .ok_or(RepositoryError::MissingReference("category"))?,
            ),
            None => None,
        };

        let created = Product {
            id: ProductId::generate(),
            name: product.name.clone(),
            category,
            price: product.price,
            description: product.description.clone(),
            image: product.image.clone(),
            favourites_count: 0,
            created_at: Utc::now(),
        };
        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let category = match patch.category {
            Some(category_id) => Some(
                state
                    .categories
                    .get(&category_id)
                    .cloned()
                    .ok_or(RepositoryError::MissingReference("category"))?,
            ),
            None => None,
        };

        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            product.name.clone_from(name);
        }
        if category.is_some() {
            product.category = category;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(description) = &patch.description {
            product.description.clone_from(description);
        }
        if patch.image.is_some() {
            product.image.clone_from(&patch.image);
        }
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if state.products.remove(&id).is_none() {
            return Ok(false);
        }
        for stored in state.users.values_mut() {
            stored.user.cart.purge(id);
            stored.user.favourites.remove(id);
        }
        Ok(true)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.check_read().await?;
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        self.check_read().await?;
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict("category_name_key".into()));
        }
        let category = Category {
            id: CategoryId::generate(),
            name: name.to_owned(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_read().await
    }
}

#[async_trait]
impl FavouritesStore for MemoryStore {
    async fn insert(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        self.check_write().await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let stored = state.users.get_mut(&user).ok_or(RepositoryError::NotFound)?;
        let entry = state
            .products
            .get_mut(&product)
            .ok_or(RepositoryError::MissingReference("product"))?;

        let inserted = stored.user.favourites.insert(product);
        if inserted {
            entry.favourites_count += 1;
        }
        Ok(inserted)
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        self.check_write().await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let stored = state.users.get_mut(&user).ok_or(RepositoryError::NotFound)?;

        let removed = stored.user.favourites.remove(product);
        if removed {
            if let Some(entry) = state.products.get_mut(&product) {
                entry.favourites_count = entry.favourites_count.saturating_sub(1);
            }
        }
        Ok(removed)
    }
}
