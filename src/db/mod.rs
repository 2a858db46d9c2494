//! Database layer
//!
//! Connection pooling, embedded migrations and the repository
//! implementations backing the service layer.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use migrations::run_migrations;
pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
