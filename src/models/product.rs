//! Product model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product entity for the catalog administration screens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: i64,
    /// Product name
    pub name: String,
    /// Description (up to 500 characters)
    pub description: Option<String>,
    /// Unit price
    pub price: f64,
    /// Units in stock
    pub stock: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new Product with the given parameters
    pub fn new(name: String, description: Option<String>, price: f64, stock: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            description,
            price,
            stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a new product
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    /// Units in stock (defaults to 0)
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Input for updating a product; unset fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

/// A page of products with pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

/// Pagination metadata returned by list endpoints
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_products: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_new() {
        let product = Product::new("Widget".to_string(), None, 9.99, 5);

        assert_eq!(product.id, 0);
        assert_eq!(product.name, "Widget");
        assert_eq!(product.price, 9.99);
        assert_eq!(product.stock, 5);
        assert!(product.description.is_none());
    }
}
