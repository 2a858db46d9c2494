//! Business logic services

pub mod product;
pub mod user;

pub use product::{ProductService, ProductServiceError};
pub use user::{RegisterInput, UserService, UserServiceError};
