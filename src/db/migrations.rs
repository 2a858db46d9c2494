//! Database schema migrations
//!
//! Migrations are embedded in the binary and applied in order at startup.
//! Each migration carries both SQLite and MySQL variants; the runner picks
//! the one matching the live driver and records applied versions in the
//! `schema_migrations` table.

use anyhow::{Context, Result};

use crate::config::DatabaseDriver;
use crate::db::pool::DynDatabasePool;

/// A single schema migration
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

/// All migrations in version order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users_table",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'default',
                birthdate TEXT,
                address TEXT,
                phone_number TEXT,
                gender TEXT,
                terms_accepted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                full_name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(32) NOT NULL DEFAULT 'default',
                birthdate DATE,
                address VARCHAR(255),
                phone_number VARCHAR(32),
                gender VARCHAR(32),
                terms_accepted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                deleted_at DATETIME,
                INDEX idx_users_deleted_at (deleted_at)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
    Migration {
        version: 2,
        name: "create_products_table",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                price REAL NOT NULL,
                stock INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                description VARCHAR(500),
                price DECIMAL(10, 2) NOT NULL,
                stock BIGINT NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                INDEX idx_products_name (name)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
        "#,
    },
];

/// Run all pending migrations against the pool
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<()> {
    create_migrations_table(pool).await?;

    let applied = applied_versions(pool).await?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let sql = match pool.driver() {
            DatabaseDriver::Sqlite => migration.up_sqlite,
            DatabaseDriver::Mysql => migration.up_mysql,
        };

        // Some migrations contain multiple statements
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            pool.execute(statement).await.with_context(|| {
                format!(
                    "Migration {} ({}) failed",
                    migration.version, migration.name
                )
            })?;
        }

        record_migration(pool, migration).await?;
    }

    Ok(())
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )"
        }
        DatabaseDriver::Mysql => {
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) ENGINE=InnoDB"
        }
    };
    pool.execute(sql)
        .await
        .context("Failed to create schema_migrations table")?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i64>> {
    use sqlx::Row;

    let versions = if let Some(sqlite) = pool.as_sqlite() {
        sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(sqlite)
            .await
            .context("Failed to read applied migrations")?
            .iter()
            .map(|row| row.get::<i64, _>("version"))
            .collect()
    } else if let Some(mysql) = pool.as_mysql() {
        sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(mysql)
            .await
            .context("Failed to read applied migrations")?
            .iter()
            .map(|row| row.get::<i64, _>("version"))
            .collect()
    } else {
        Vec::new()
    };

    Ok(versions)
}

async fn record_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    if let Some(sqlite) = pool.as_sqlite() {
        sqlx::query(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, datetime('now'))",
        )
        .bind(migration.version)
        .bind(migration.name)
        .execute(sqlite)
        .await
        .context("Failed to record migration")?;
    } else if let Some(mysql) = pool.as_mysql() {
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(mysql)
            .await
            .context("Failed to record migration")?;
    }
    Ok(())
}
