//! Product service
//!
//! Catalog CRUD with validation and paginated listing.

use crate::db::repositories::ProductRepository;
use crate::models::{CreateProductInput, Pagination, Product, ProductPage, UpdateProductInput};
use anyhow::Context;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum description length in characters
const MAX_DESCRIPTION_LEN: usize = 500;

/// Price bounds
const MIN_PRICE: f64 = 0.01;
const MAX_PRICE: f64 = 99_999_999.99;

/// Error types for product service operations
#[derive(Debug, thiserror::Error)]
pub enum ProductServiceError {
    /// Input validation failed; maps field name to message
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    /// Product not found
    #[error("Product not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Product service for catalog management
pub struct ProductService {
    product_repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    /// Create a new product service with the given repository
    pub fn new(product_repo: Arc<dyn ProductRepository>) -> Self {
        Self { product_repo }
    }

    /// List a page of products with pagination metadata
    pub async fn list_products(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<ProductPage, ProductServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let (products, total) = self
            .product_repo
            .list(page, per_page)
            .await
            .context("Failed to list products")?;

        let total_pages = if total == 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };

        Ok(ProductPage {
            products,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_products: total,
            },
        })
    }

    /// Get a product by ID
    pub async fn get_product(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.product_repo
            .get_by_id(id)
            .await
            .context("Failed to get product")?
            .ok_or(ProductServiceError::NotFound)
    }

    /// Create a new product
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<Product, ProductServiceError> {
        let mut errors = BTreeMap::new();
        validate_name(&input.name, &mut errors);
        validate_description(input.description.as_deref(), &mut errors);
        validate_price(input.price, &mut errors);
        let stock = input.stock.unwrap_or(0);
        validate_stock(stock, &mut errors);
        if !errors.is_empty() {
            return Err(ProductServiceError::Validation(errors));
        }

        let product = Product::new(
            input.name.trim().to_string(),
            input.description,
            input.price,
            stock,
        );

        let created = self
            .product_repo
            .create(&product)
            .await
            .context("Failed to create product")?;

        Ok(created)
    }

    /// Update a product; unset fields keep their current value
    pub async fn update_product(
        &self,
        id: i64,
        input: UpdateProductInput,
    ) -> Result<Product, ProductServiceError> {
        let mut product = self
            .product_repo
            .get_by_id(id)
            .await
            .context("Failed to get product")?
            .ok_or(ProductServiceError::NotFound)?;

        let mut errors = BTreeMap::new();
        if let Some(ref name) = input.name {
            validate_name(name, &mut errors);
        }
        if let Some(ref description) = input.description {
            validate_description(Some(description), &mut errors);
        }
        if let Some(price) = input.price {
            validate_price(price, &mut errors);
        }
        if let Some(stock) = input.stock {
            validate_stock(stock, &mut errors);
        }
        if !errors.is_empty() {
            return Err(ProductServiceError::Validation(errors));
        }

        if let Some(name) = input.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            product.description = Some(description);
        }
        if let Some(price) = input.price {
            product.price = price;
        }
        if let Some(stock) = input.stock {
            product.stock = stock;
        }

        let updated = self
            .product_repo
            .update(&product)
            .await
            .context("Failed to update product")?;

        Ok(updated)
    }

    /// Delete a product
    pub async fn delete_product(&self, id: i64) -> Result<(), ProductServiceError> {
        let removed = self
            .product_repo
            .delete(id)
            .await
            .context("Failed to delete product")?;

        if !removed {
            return Err(ProductServiceError::NotFound);
        }

        Ok(())
    }
}

fn validate_name(name: &str, errors: &mut BTreeMap<String, String>) {
    if name.trim().is_empty() {
        errors.insert("name".to_string(), "Name is required".to_string());
    }
}

fn validate_description(description: Option<&str>, errors: &mut BTreeMap<String, String>) {
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.insert(
                "description".to_string(),
                format!("Description must be at most {} characters", MAX_DESCRIPTION_LEN),
            );
        }
    }
}

fn validate_price(price: f64, errors: &mut BTreeMap<String, String>) {
    if !price.is_finite() || !(MIN_PRICE..=MAX_PRICE).contains(&price) {
        errors.insert(
            "price".to_string(),
            format!("Price must be between {} and {}", MIN_PRICE, MAX_PRICE),
        );
    }
}

fn validate_stock(stock: i64, errors: &mut BTreeMap<String, String>) {
    if stock < 0 {
        errors.insert(
            "stock".to_string(),
            "Stock cannot be negative".to_string(),
        );
    }
}
