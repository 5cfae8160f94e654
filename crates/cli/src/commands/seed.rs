//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Kitchen
//!     products:
//!       - name: Enamel mug
//!         price: "12.50"
//!         description: Speckled blue, 350ml
//!         image: mugs/enamel.png
//! ```
//!
//! Categories that already exist (by name) are reused. Products are always
//! inserted, so running the same file twice duplicates them.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use emporium_core::Price;
use emporium_server::db::{self, PgProductCatalog, ProductCatalog, RepositoryError};
use emporium_server::models::NewProduct;
use emporium_server::services::validate_key;

use super::database_url;

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

/// Counts reported after a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub categories_reused: usize,
    pub products_inserted: usize,
}

/// Problems that would make the file seed badly. Empty means valid.
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashMap::new();

    for (i, category) in seed.categories.iter().enumerate() {
        let name = category.name.trim();
        if name.is_empty() {
            errors.push(format!("category #{}: name is blank", i + 1));
            continue;
        }
        if let Some(first) = seen.insert(name.to_lowercase(), i) {
            errors.push(format!(
                "category {name:?}: duplicate of category #{}",
                first + 1
            ));
        }
        for (j, product) in category.products.iter().enumerate() {
            if product.name.trim().is_empty() {
                errors.push(format!("category {name:?}, product #{}: name is blank", j + 1));
            }
            if let Some(image) = &product.image {
                if validate_key(image).is_err() {
                    errors.push(format!(
                        "category {name:?}, product #{}: invalid image key {image:?}",
                        j + 1
                    ));
                }
            }
        }
    }

    errors
}

/// Insert every category and product in `seed`.
///
/// # Errors
///
/// Returns `RepositoryError` on the first failed insert; earlier inserts stay.
pub async fn apply(
    catalog: &dyn ProductCatalog,
    seed: &CatalogSeed,
) -> Result<SeedReport, RepositoryError> {
    let mut report = SeedReport::default();
    let mut existing: HashMap<String, _> = catalog
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect();

    for category in &seed.categories {
        let name = category.name.trim();
        let category_id = if let Some(id) = existing.get(&name.to_lowercase()) {
            report.categories_reused += 1;
            *id
        } else {
            let created = catalog.create_category(name).await?;
            info!(category = %created.name, id = %created.id, "Created category");
            existing.insert(name.to_lowercase(), created.id);
            report.categories_created += 1;
            created.id
        };

        for product in &category.products {
            catalog
                .create(&NewProduct {
                    name: product.name.trim().to_owned(),
                    category: Some(category_id),
                    price: product.price,
                    description: product.description.clone(),
                    image: product.image.clone(),
                })
                .await?;
            report.products_inserted += 1;
        }
    }

    Ok(report)
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn catalog(file_path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    info!(path = %file_path.display(), "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file_path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let products: usize = seed.categories.iter().map(|c| c.products.len()).sum();
    info!(
        categories = seed.categories.len(),
        products, "Catalog validated successfully"
    );

    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let report = apply(&PgProductCatalog::new(pool.clone()), &seed).await?;
    pool.close().await;

    info!("Seeding complete!");
    info!("  Categories created: {}", report.categories_created);
    info!("  Categories reused: {}", report.categories_reused);
    info!("  Products inserted: {}", report.products_inserted);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::ProductSort;
    use emporium_server::db::MemoryStore;
    use emporium_server::models::ProductFilter;

    use super::*;

    const CATALOG: &str = r#"
categories:
  - name: Kitchen
    products:
      - name: Enamel mug
        price: "12.50"
        description: Speckled blue
      - name: Teapot
        price: 40
        image: teapots/brown.png
  - name: Garden
"#;

    #[test]
    fn test_parse_catalog() {
        let seed: CatalogSeed = serde_yaml::from_str(CATALOG).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[0].products.len(), 2);
        assert_eq!(seed.categories[0].products[0].price.to_string(), "12.50");
        assert!(seed.categories[1].products.is_empty());
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_negative_price_rejected() {
        let yaml = "categories:\n  - name: X\n    products:\n      - name: Y\n        price: \"-1\"\n";
        assert!(serde_yaml::from_str::<CatalogSeed>(yaml).is_err());
    }

    #[test]
    fn test_validate_flags_blank_and_duplicate_names() {
        let yaml = r#"
categories:
  - name: Kitchen
    products:
      - name: "  "
        price: 1
  - name: kitchen
  - name: ""
"#;
        let seed: CatalogSeed = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&seed);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn test_validate_flags_escaping_image_keys() {
        let yaml = r#"
categories:
  - name: Kitchen
    products:
      - name: Kettle
        price: 1
        image: ../../etc/passwd
      - name: Mug
        price: 1
        image: mugs/enamel.png
"#;
        let seed: CatalogSeed = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&seed);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors.iter().all(|e| e.contains("invalid image key")));
    }

    #[tokio::test]
    async fn test_apply_reuses_existing_categories() {
        let store = MemoryStore::new();
        store.create_category("Kitchen").await.unwrap();

        let seed: CatalogSeed = serde_yaml::from_str(CATALOG).unwrap();
        let report = apply(&store, &seed).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                categories_created: 1,
                categories_reused: 1,
                products_inserted: 2,
            }
        );

        let products = store
            .list(&ProductFilter::default(), ProductSort::Price, 0, 10)
            .await
            .unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Enamel mug", "Teapot"]);
        assert!(products
            .iter()
            .all(|p| p.category.as_ref().is_some_and(|c| c.name == "Kitchen")));
    }
}
