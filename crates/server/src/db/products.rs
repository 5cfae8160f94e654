//! Product and category repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use emporium_core::{CategoryId, Price, ProductId, ProductSort};

use super::{ProductCatalog, RepositoryError};
use crate::models::{Category, NewProduct, Product, ProductFilter, ProductPatch};

/// `PostgreSQL` implementation of [`ProductCatalog`].
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Create a new catalog store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    price: Price,
    description: String,
    image: Option<String>,
    favourites_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let favourites_count = u64::try_from(row.favourites_count).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative favourites_count {} on product {}",
                row.favourites_count, row.id
            ))
        })?;

        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category { id, name }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            category,
            price: row.price,
            description: row.description,
            image: row.image,
            favourites_count,
            created_at: row.created_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Select list shared by every product query. Expects the product table
/// (or CTE) aliased as `p`.
const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.category_id, c.name AS category_name, \
                              p.price, p.description, p.image, p.favourites_count, p.created_at";

const fn order_clause(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Random => " ORDER BY p.id",
        ProductSort::Price => " ORDER BY p.price ASC, p.id",
        ProductSort::Created => " ORDER BY p.created_at DESC, p.id",
        ProductSort::Favourites => " ORDER BY p.favourites_count DESC, p.id",
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        builder.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND p.name ILIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn count(&self, filter: &ProductFilter) -> Result<u64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM product p");
        push_filter(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count {count}")))
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::new(PRODUCT_SELECT);
        builder.push(" FROM product p LEFT JOIN category c ON c.id = p.category_id");
        push_filter(&mut builder, filter);
        builder.push(order_clause(sort));
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_products(rows)
    }

    async fn sample(&self, count: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM product p LEFT JOIN category c ON c.id = p.category_id \
             ORDER BY random() LIMIT $1"
        ))
        .bind(i64::from(count))
        .fetch_all(&self.pool)
        .await?;
        into_products(rows)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM product p LEFT JOIN category c ON c.id = p.category_id \
             WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM product p LEFT JOIN category c ON c.id = p.category_id \
             WHERE p.id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        into_products(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference("category")` for an unknown category.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            WITH p AS (
                INSERT INTO product (id, name, category_id, price, description, image)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            {PRODUCT_SELECT} FROM p LEFT JOIN category c ON c.id = p.category_id
            "
        ))
        .bind(ProductId::generate())
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category"))?;
        Product::try_from(row)
    }

    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            WITH p AS (
                UPDATE product SET
                    name = COALESCE($2, name),
                    category_id = COALESCE($3, category_id),
                    price = COALESCE($4, price),
                    description = COALESCE($5, description),
                    image = COALESCE($6, image)
                WHERE id = $1
                RETURNING *
            )
            {PRODUCT_SELECT} FROM p LEFT JOIN category c ON c.id = p.category_id
            "
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(patch.category)
        .bind(patch.price)
        .bind(&patch.description)
        .bind(&patch.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category"))?;
        row.map(Product::try_from).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        // cart_line and favourite rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<(CategoryId, String)> =
            sqlx::query_as("SELECT id, name FROM category ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<(CategoryId, String)> =
            sqlx::query_as("SELECT id, name FROM category WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| Category { id, name }))
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let (id, name): (CategoryId, String) =
            sqlx::query_as("INSERT INTO category (id, name) VALUES ($1, $2) RETURNING id, name")
                .bind(CategoryId::generate())
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::from_constraint(e, "category"))?;
        Ok(Category { id, name })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
