//! Data models
//!
//! This module contains all data structures used throughout the tienda backend.
//! Models represent:
//! - Database entities (User, Product)
//! - API request/response types
//! - Internal data transfer objects

mod product;
mod user;

pub use product::{CreateProductInput, Pagination, Product, ProductPage, UpdateProductInput};
pub use user::{CreateUserInput, Role, UpdateUserInput, User};
