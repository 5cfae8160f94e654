//! Favourites membership and the product popularity counter.

use async_trait::async_trait;
use sqlx::PgPool;

use emporium_core::{ProductId, UserId};

use super::{FavouritesStore, RepositoryError};

/// `PostgreSQL` implementation of [`FavouritesStore`].
///
/// Membership rows and `product.favourites_count` change in one transaction,
/// and the counter only moves when a row was really inserted or deleted.
pub struct PgFavouritesStore {
    pool: PgPool,
}

impl PgFavouritesStore {
    /// Create a new favourites store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavouritesStore for PgFavouritesStore {
    async fn insert(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO favourite (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user)
        .bind(product)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product"))?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query("UPDATE product SET favourites_count = favourites_count + 1 WHERE id = $1")
                .bind(product)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM favourite WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            == 1;

        if removed {
            sqlx::query(
                "UPDATE product SET favourites_count = GREATEST(favourites_count - 1, 0) WHERE id = $1",
            )
            .bind(product)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }
}
