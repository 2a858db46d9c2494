//! Product repository
//!
//! Database operations for catalog products. Unlike users, products are
//! hard-deleted: a removed product leaves no row behind.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Product;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Product repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Create a new product
    async fn create(&self, product: &Product) -> Result<Product>;

    /// Get a product by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Update a product
    async fn update(&self, product: &Product) -> Result<Product>;

    /// Delete a product, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count products
    async fn count(&self) -> Result<i64>;

    /// List products with pagination, newest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Product>, i64)>;
}

/// SQLx-based product repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    /// Create a new SQLx product repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create(&self, product: &Product) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_product_sqlite(self.pool.as_sqlite().unwrap(), product).await
            }
            DatabaseDriver::Mysql => {
                create_product_mysql(self.pool.as_mysql().unwrap(), product).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_product_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_product_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn update(&self, product: &Product) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_product_sqlite(self.pool.as_sqlite().unwrap(), product).await
            }
            DatabaseDriver::Mysql => {
                update_product_mysql(self.pool.as_mysql().unwrap(), product).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_product_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_product_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_products_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_products_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Product>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_products_sqlite(self.pool.as_sqlite().unwrap(), page, per_page).await
            }
            DatabaseDriver::Mysql => {
                list_products_mysql(self.pool.as_mysql().unwrap(), page, per_page).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_product_sqlite(pool: &SqlitePool, product: &Product) -> Result<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO products (name, description, price, stock, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    let id = result.last_insert_rowid();

    Ok(Product {
        id,
        created_at: now,
        updated_at: now,
        ..product.clone()
    })
}

async fn get_product_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(
        "SELECT id, name, description, price, stock, created_at, updated_at \
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get product by ID")?;

    Ok(row.map(|row| row_to_product_sqlite(&row)))
}

async fn update_product_sqlite(pool: &SqlitePool, product: &Product) -> Result<Product> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE products
        SET name = ?, description = ?, price = ?, stock = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(product.id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    get_product_by_id_sqlite(pool, product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Product not found after update"))
}

async fn delete_product_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected() > 0)
}

async fn count_products_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM products")
        .fetch_one(pool)
        .await
        .context("Failed to count products")?;

    Ok(row.get("count"))
}

async fn list_products_sqlite(
    pool: &SqlitePool,
    page: i64,
    per_page: i64,
) -> Result<(Vec<Product>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(
        "SELECT id, name, description, price, stock, created_at, updated_at \
         FROM products ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list products")?;

    let products = rows.iter().map(row_to_product_sqlite).collect();
    let total = count_products_sqlite(pool).await?;

    Ok((products, total))
}

fn row_to_product_sqlite(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        stock: row.get("stock"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_product_mysql(pool: &MySqlPool, product: &Product) -> Result<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO products (name, description, price, stock, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    let id = result.last_insert_id() as i64;

    Ok(Product {
        id,
        created_at: now,
        updated_at: now,
        ..product.clone()
    })
}

async fn get_product_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(
        "SELECT id, name, description, price, stock, created_at, updated_at \
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get product by ID")?;

    Ok(row.map(|row| row_to_product_mysql(&row)))
}

async fn update_product_mysql(pool: &MySqlPool, product: &Product) -> Result<Product> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE products
        SET name = ?, description = ?, price = ?, stock = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(product.id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    get_product_by_id_mysql(pool, product.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Product not found after update"))
}

async fn delete_product_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected() > 0)
}

async fn count_products_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM products")
        .fetch_one(pool)
        .await
        .context("Failed to count products")?;

    Ok(row.get("count"))
}

async fn list_products_mysql(
    pool: &MySqlPool,
    page: i64,
    per_page: i64,
) -> Result<(Vec<Product>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(
        "SELECT id, name, description, price, stock, created_at, updated_at \
         FROM products ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list products")?;

    let products = rows.iter().map(row_to_product_mysql).collect();
    let total = count_products_mysql(pool).await?;

    Ok((products, total))
}

fn row_to_product_mysql(row: &sqlx::mysql::MySqlRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        stock: row.get("stock"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
