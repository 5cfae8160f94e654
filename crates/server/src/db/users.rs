//! User repository for database operations.
//!
//! The user aggregate spans three tables: `app_user` for the account and
//! profile, `cart_line` for the cart and `favourite` for favourites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use emporium_core::{Email, ProductId, Quantity, UserId};

use super::{RepositoryError, UserStore};
use crate::models::{Address, Cart, CartLine, Favourites, NewUser, Profile, User};

/// `PostgreSQL` implementation of [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_cart(&self, id: UserId) -> Result<Cart, RepositoryError> {
        let rows: Vec<(ProductId, i32)> = sqlx::query_as(
            r"
            SELECT product_id, quantity
            FROM cart_line
            WHERE user_id = $1
            ORDER BY position
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|(product_id, quantity)| {
                Quantity::try_from(quantity)
                    .map(|quantity| CartLine {
                        product_id,
                        quantity,
                    })
                    .map_err(|e| {
                        RepositoryError::DataCorruption(format!("invalid cart quantity: {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Cart::from_lines(lines)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid cart lines: {e}")))
    }

    async fn load_favourites(&self, id: UserId) -> Result<Favourites, RepositoryError> {
        let ids: Vec<ProductId> = sqlx::query_scalar(
            r"
            SELECT product_id
            FROM favourite
            WHERE user_id = $1
            ORDER BY created_at, product_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Favourites::from_ids(ids))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    user_name: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, cart: Cart, favourites: Favourites) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: self.id,
            user_name: self.user_name,
            email,
            profile: Profile {
                first_name: self.first_name,
                last_name: self.last_name,
                phone_number: self.phone_number,
                address: Address {
                    street: self.street,
                    city: self.city,
                    state: self.state,
                    postcode: self.postcode,
                },
            },
            cart,
            favourites,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, user_name, email, first_name, last_name, phone_number, \
                            street, city, state, postcode, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    async fn create(&self, user: &NewUser, password_hash: &str) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO app_user (id, user_name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(UserId::generate())
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "user"))?;

        row.into_user(Cart::default(), Favourites::default())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let cart = self.load_cart(id).await?;
        let favourites = self.load_favourites(id).await?;
        row.into_user(cart, favourites).map(Some)
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(UserId, String)>, RepositoryError> {
        let row: Option<(UserId, String)> =
            sqlx::query_as("SELECT id, password_hash FROM app_user WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn save_cart(&self, id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE app_user SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM cart_line WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if !cart.is_empty() {
            let mut products: Vec<Uuid> = Vec::with_capacity(cart.len());
            let mut quantities: Vec<i32> = Vec::with_capacity(cart.len());
            let mut positions: Vec<i32> = Vec::with_capacity(cart.len());
            for (position, line) in (0_i32..).zip(cart.lines()) {
                products.push(line.product_id.as_uuid());
                quantities.push(line.quantity.into());
                positions.push(position);
            }

            sqlx::query(
                r"
                INSERT INTO cart_line (user_id, product_id, quantity, position)
                SELECT $1, product_id, quantity, position
                FROM UNNEST($2::uuid[], $3::int4[], $4::int4[])
                    AS line(product_id, quantity, position)
                ",
            )
            .bind(id)
            .bind(&products)
            .bind(&quantities)
            .bind(&positions)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "product"))?;
        }

        tx.commit().await?;
        Ok(())
    }
}
