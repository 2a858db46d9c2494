//! User repository
//!
//! Database operations for user accounts.
//!
//! Deletion is a soft delete: rows keep their data and gain a `deleted_at`
//! timestamp. Lookups used by authentication and listings exclude deleted
//! rows, so a retired account behaves exactly like a missing one.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Role, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get a live (non-deleted) user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get a live (non-deleted) user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check whether any row (deleted included) holds this email.
    ///
    /// The UNIQUE index on `users.email` still covers soft-deleted rows, so
    /// uniqueness checks must look past the `deleted_at` filter.
    async fn email_in_use(&self, email: &str) -> Result<bool>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Soft-delete a user by setting `deleted_at`
    async fn soft_delete(&self, id: i64) -> Result<()>;

    /// Count live users
    async fn count(&self) -> Result<i64>;

    /// List live users with pagination, newest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await
            }
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn email_in_use(&self, email: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                email_in_use_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                email_in_use_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_user_sqlite(self.pool.as_sqlite().unwrap(), user).await
            }
            DatabaseDriver::Mysql => update_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                soft_delete_user_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                soft_delete_user_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_users_sqlite(self.pool.as_sqlite().unwrap(), page, per_page).await
            }
            DatabaseDriver::Mysql => {
                list_users_mysql(self.pool.as_mysql().unwrap(), page, per_page).await
            }
        }
    }
}

const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, birthdate, address, \
     phone_number, gender, terms_accepted, created_at, updated_at, deleted_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, password_hash, role, birthdate, address,
                           phone_number, gender, terms_accepted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(user.birthdate)
    .bind(&user.address)
    .bind(&user.phone_number)
    .bind(&user.gender)
    .bind(user.terms_accepted)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE id = ? AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ? AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn email_in_use_sqlite(pool: &SqlitePool, email: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to check email")?;

    Ok(row.get::<i64, _>("count") > 0)
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, email = ?, password_hash = ?, role = ?, birthdate = ?,
            address = ?, phone_number = ?, gender = ?, updated_at = ?
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(user.birthdate)
    .bind(&user.address)
    .bind(&user.phone_number)
    .bind(&user.gender)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn soft_delete_user_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to delete user")?;

    Ok(())
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_sqlite(
    pool: &SqlitePool,
    page: i64,
    per_page: i64,
) -> Result<(Vec<User>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_sqlite(&row)?);
    }

    let total = count_users_sqlite(pool).await?;

    Ok((users, total))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        birthdate: row.get("birthdate"),
        address: row.get("address"),
        phone_number: row.get("phone_number"),
        gender: row.get("gender"),
        terms_accepted: row.get("terms_accepted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, password_hash, role, birthdate, address,
                           phone_number, gender, terms_accepted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(user.birthdate)
    .bind(&user.address)
    .bind(&user.phone_number)
    .bind(&user.gender)
    .bind(user.terms_accepted)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE id = ? AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ? AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn email_in_use_mysql(pool: &MySqlPool, email: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to check email")?;

    Ok(row.get::<i64, _>("count") > 0)
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = ?, email = ?, password_hash = ?, role = ?, birthdate = ?,
            address = ?, phone_number = ?, gender = ?, updated_at = ?
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&role_str)
    .bind(user.birthdate)
    .bind(&user.address)
    .bind(&user.phone_number)
    .bind(&user.gender)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn soft_delete_user_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to delete user")?;

    Ok(())
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users_mysql(pool: &MySqlPool, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_mysql(&row)?);
    }

    let total = count_users_mysql(pool).await?;

    Ok((users, total))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        birthdate: row.get("birthdate"),
        address: row.get("address"),
        phone_number: row.get("phone_number"),
        gender: row.get("gender"),
        terms_accepted: row.get("terms_accepted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_user(name: &str, email: &str) -> User {
        User::new(
            name.to_string(),
            email.to_string(),
            hash_password("test_password").expect("Failed to hash password"),
            Role::Cliente,
        )
    }

    #[tokio::test]
    async fn test_create_user() {
        let (_pool, repo) = setup_test_repo().await;
        let user = create_test_user("Test User", "test@example.com");

        let created = repo.create(&user).await.expect("Failed to create user");

        assert!(created.id > 0);
        assert_eq!(created.full_name, "Test User");
        assert_eq!(created.email, "test@example.com");
        assert_eq!(created.role, Role::Cliente);
        assert!(created.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Find Me", "findme@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.full_name, "Find Me");
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo.get_by_id(999).await.expect("Failed to get user");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_email() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_user("Email User", "unique@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_email("unique@example.com")
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.email, "unique@example.com");
    }

    #[tokio::test]
    async fn test_update_user() {
        let (_pool, repo) = setup_test_repo().await;
        let mut created = repo
            .create(&create_test_user("Update Me", "update@example.com"))
            .await
            .expect("Failed to create user");

        created.full_name = "Updated Name".to_string();
        created.role = Role::Distribuidor;
        created.phone_number = Some("555-0100".to_string());

        let updated = repo.update(&created).await.expect("Failed to update user");

        assert_eq!(updated.full_name, "Updated Name");
        assert_eq!(updated.role, Role::Distribuidor);
        assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
        assert!(updated.updated_at >= created.created_at);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_user() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Delete Me", "delete@example.com"))
            .await
            .expect("Failed to create user");

        repo.soft_delete(created.id)
            .await
            .expect("Failed to delete user");

        // Gone from every lookup path
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo
            .get_by_email("delete@example.com")
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let (pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Keep Row", "keep@example.com"))
            .await
            .expect("Failed to create user");

        repo.soft_delete(created.id).await.unwrap();

        // The row still exists with deleted_at set
        let sqlite = pool.as_sqlite().unwrap();
        let row = sqlx::query("SELECT deleted_at FROM users WHERE id = ?")
            .bind(created.id)
            .fetch_one(sqlite)
            .await
            .expect("Row should still exist");
        assert!(row
            .get::<Option<chrono::DateTime<Utc>>, _>("deleted_at")
            .is_some());
    }

    #[tokio::test]
    async fn test_email_in_use_sees_deleted_rows() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Retired", "retired@example.com"))
            .await
            .unwrap();

        assert!(repo.email_in_use("retired@example.com").await.unwrap());

        repo.soft_delete(created.id).await.unwrap();

        // Gone from live lookups, but the email is still taken
        assert!(repo
            .get_by_email("retired@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(repo.email_in_use("retired@example.com").await.unwrap());
        assert!(!repo.email_in_use("free@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_excludes_deleted() {
        let (_pool, repo) = setup_test_repo().await;

        let u1 = repo
            .create(&create_test_user("User 1", "u1@example.com"))
            .await
            .unwrap();
        repo.create(&create_test_user("User 2", "u2@example.com"))
            .await
            .unwrap();
        repo.create(&create_test_user("User 3", "u3@example.com"))
            .await
            .unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);

        repo.soft_delete(u1.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (_pool, repo) = setup_test_repo().await;

        for i in 0..5 {
            repo.create(&create_test_user(
                &format!("User {}", i),
                &format!("user{}@example.com", i),
            ))
            .await
            .unwrap();
        }

        let (page1, total) = repo.list(1, 2).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(total, 5);

        let (page3, _) = repo.list(3, 2).await.unwrap();
        assert_eq!(page3.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_email_constraint() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&create_test_user("User A", "duplicate@example.com"))
            .await
            .expect("Failed to create first user");
        let result = repo
            .create(&create_test_user("User B", "duplicate@example.com"))
            .await;

        assert!(result.is_err(), "Should fail due to duplicate email");
    }

    #[tokio::test]
    async fn test_profile_fields_round_trip() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = create_test_user("Profile", "profile@example.com");
        user.birthdate = chrono::NaiveDate::from_ymd_opt(1990, 6, 15);
        user.address = Some("123 Main St".to_string());
        user.gender = Some("other".to_string());
        user.terms_accepted = true;

        let created = repo.create(&user).await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.birthdate, user.birthdate);
        assert_eq!(found.address.as_deref(), Some("123 Main St"));
        assert_eq!(found.gender.as_deref(), Some("other"));
        assert!(found.terms_accepted);
    }

    #[tokio::test]
    async fn test_password_hash_stored_correctly() {
        let (_pool, repo) = setup_test_repo().await;
        let hash = hash_password("my_secure_password").expect("Failed to hash password");
        let user = User::new(
            "Hash Test".to_string(),
            "hashtest@example.com".to_string(),
            hash.clone(),
            Role::Default,
        );

        let created = repo.create(&user).await.expect("Failed to create user");
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.password_hash, hash);
        assert!(found.password_hash.starts_with("$argon2id$"));
    }
}
