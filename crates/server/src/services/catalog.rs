//! Product listing, detail and catalog maintenance.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use emporium_core::{CategoryId, ProductId, ProductSort, SortError};

use super::blob::{BlobError, BlobStore};
use crate::db::{ProductCatalog, RepositoryError};
use crate::models::{Category, NewProduct, Product, ProductFilter, ProductPatch};

/// Largest sample a client may ask for.
pub const MAX_SAMPLE: u32 = 50;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// `orderby` absent.
    #[error("Invalid orderby parameter")]
    MissingSort,

    /// `orderby` not one of the accepted keys.
    #[error("Invalid orderby parameter")]
    InvalidSort(#[source] SortError),

    #[error("invalid category id: {0:?}")]
    InvalidCategory(String),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("category {0:?} already exists")]
    DuplicateCategory(String),

    /// A field failed validation.
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// A product as sent to clients, with its image inlined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Base64 image bytes, `null` when the product has no image.
    pub image_data: Option<String>,
}

impl ProductView {
    /// Attach the product's image bytes.
    ///
    /// # Errors
    ///
    /// Returns `BlobError` if the product names an image that cannot be read.
    pub async fn load(blobs: &dyn BlobStore, product: Product) -> Result<Self, BlobError> {
        let image_data = match &product.image {
            Some(key) => Some(STANDARD.encode(blobs.read(key).await?)),
            None => None,
        };
        Ok(Self {
            product,
            image_data,
        })
    }
}

async fn load_views(
    blobs: &dyn BlobStore,
    products: Vec<Product>,
) -> Result<Vec<ProductView>, BlobError> {
    let mut views = Vec::with_capacity(products.len());
    for product in products {
        views.push(ProductView::load(blobs, product).await?);
    }
    Ok(views)
}

/// Raw listing query parameters.
#[derive(Debug, Default)]
pub struct ListingQuery<'a> {
    pub orderby: Option<&'a str>,
    pub pagenum: Option<&'a str>,
    pub search: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// One page of a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
}

/// Parsed and normalized listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listing {
    sort: ProductSort,
    page: u32,
    filter: ProductFilter,
}

impl Listing {
    fn parse(query: &ListingQuery<'_>) -> Result<Self, CatalogError> {
        let sort = query
            .orderby
            .ok_or(CatalogError::MissingSort)?
            .parse::<ProductSort>()
            .map_err(CatalogError::InvalidSort)?;

        // Anything that is not a positive integer means the first page
        let page = query
            .pagenum
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        let category = query
            .category
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                raw.parse::<CategoryId>()
                    .map_err(|_| CatalogError::InvalidCategory(raw.to_owned()))
            })
            .transpose()?;

        let search = query
            .search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Ok(Self {
            sort,
            page,
            filter: ProductFilter { category, search },
        })
    }

    fn link(&self, base: &str, page: u32) -> String {
        let mut link = format!("{base}?orderby={}&pagenum={page}", self.sort);
        if let Some(search) = &self.filter.search {
            link.push_str("&search=");
            link.push_str(&urlencoding::encode(search));
        }
        if let Some(category) = self.filter.category {
            link.push_str(&format!("&category={category}"));
        }
        link
    }
}

/// Number of pages needed for `count` items.
fn total_pages(count: u64, page_size: u32) -> u64 {
    count.div_ceil(u64::from(page_size.max(1)))
}

/// Catalog service.
pub struct CatalogService<'a> {
    catalog: &'a dyn ProductCatalog,
    blobs: &'a dyn BlobStore,
    page_size: u32,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(
        catalog: &'a dyn ProductCatalog,
        blobs: &'a dyn BlobStore,
        page_size: u32,
    ) -> Self {
        Self {
            catalog,
            blobs,
            page_size,
        }
    }

    /// List one page of products.
    ///
    /// `base` is the path the next/previous links point at.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingSort` or `CatalogError::InvalidSort`
    /// before touching the store.
    #[instrument(skip(self, query), fields(orderby = ?query.orderby, pagenum = ?query.pagenum))]
    pub async fn list(
        &self,
        base: &str,
        query: &ListingQuery<'_>,
    ) -> Result<ProductPage, CatalogError> {
        let listing = Listing::parse(query)?;

        let count = self.catalog.count(&listing.filter).await?;
        let pages = total_pages(count, self.page_size);
        let offset = u64::from(listing.page - 1) * u64::from(self.page_size);

        let products = self
            .catalog
            .list(&listing.filter, listing.sort, offset, self.page_size)
            .await?;

        let next_page = (u64::from(listing.page) < pages)
            .then(|| listing.link(base, listing.page + 1));
        let prev_page = (listing.page > 1).then(|| listing.link(base, listing.page - 1));

        Ok(ProductPage {
            products: load_views(self.blobs, products).await?,
            next_page,
            prev_page,
        })
    }

    /// Up to `count` random products, capped at [`MAX_SAMPLE`].
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on store or blob failures.
    pub async fn sample(&self, count: u32) -> Result<Vec<ProductView>, CatalogError> {
        let products = self.catalog.sample(count.min(MAX_SAMPLE)).await?;
        Ok(load_views(self.blobs, products).await?)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it does not exist.
    pub async fn get(&self, id: ProductId) -> Result<ProductView, CatalogError> {
        let product = self
            .catalog
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;
        Ok(ProductView::load(self.blobs, product).await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` for a blank name or an image key
    /// that is malformed or not stored, and `CatalogError::CategoryNotFound`
    /// for an unknown category.
    #[instrument(skip_all, fields(name = %product.name))]
    pub async fn create(&self, mut product: NewProduct) -> Result<Product, CatalogError> {
        product.name = required_name(&product.name)?;
        product.image = self.stored_image(product.image.take()).await?;
        let created = self
            .catalog
            .create(&product)
            .await
            .map_err(map_missing_category)?;
        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist
    /// and `CatalogError::InvalidInput` for the same field problems as
    /// [`create`](Self::create).
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: ProductId,
        mut patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        if let Some(name) = &patch.name {
            patch.name = Some(required_name(name)?);
        }
        patch.image = self.stored_image(patch.image.take()).await?;
        self.catalog
            .update(id, &patch)
            .await
            .map_err(map_missing_category)?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Delete a product, dropping it from every cart and favourites set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.catalog.delete(id).await? {
            tracing::info!(product_id = %id, "product deleted");
            Ok(())
        } else {
            Err(CatalogError::ProductNotFound)
        }
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on store failures.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.catalog.list_categories().await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateCategory` if the name is taken.
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = required_name(name)?;
        self.catalog
            .create_category(&name)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CatalogError::DuplicateCategory(name.clone()),
                other => CatalogError::Repository(other),
            })
    }

    /// A blank key means no image. Anything else must name a stored blob.
    async fn stored_image(&self, image: Option<String>) -> Result<Option<String>, CatalogError> {
        let Some(key) = image.map(|key| key.trim().to_owned()).filter(|key| !key.is_empty())
        else {
            return Ok(None);
        };
        match self.blobs.exists(&key).await {
            Ok(true) => Ok(Some(key)),
            Ok(false) => Err(CatalogError::InvalidInput(format!("image {key:?} not found"))),
            Err(BlobError::InvalidKey(_)) => {
                Err(CatalogError::InvalidInput(format!("invalid image key {key:?}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn required_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidInput("name is required".into()));
    }
    Ok(name.to_owned())
}

fn map_missing_category(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::MissingReference("category") => CatalogError::CategoryNotFound,
        other => CatalogError::Repository(other),
    }
}
