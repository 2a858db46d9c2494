//! Repository implementations for data access

pub mod product;
pub mod user;

pub use product::{ProductRepository, SqlxProductRepository};
pub use user::{SqlxUserRepository, UserRepository};
