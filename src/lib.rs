//! Tienda - session-authenticated administration backend
//!
//! This library provides the core functionality for the tienda admin
//! service: local and GitHub OAuth authentication, signed session cookies,
//! role-based authorization and CRUD over users and products.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
