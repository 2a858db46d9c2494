//! User model
//!
//! Defines the User entity and the role enum used for authorization
//! decisions across the admin screens.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// Accounts created through GitHub OAuth carry a throwaway credential hash
/// that can never match a login attempt; they authenticate only via OAuth
/// until a password is set by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub full_name: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2id PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: Role,
    /// Date of birth
    pub birthdate: Option<NaiveDate>,
    /// Postal address
    pub address: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Whether the terms of service were accepted at registration
    pub terms_accepted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; a set value means the account is retired
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; use `auth::password::hash_password`.
    pub fn new(full_name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            full_name,
            email,
            password_hash,
            role,
            birthdate: None,
            address: None,
            phone_number: None,
            gender: None,
            terms_accepted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if the user account has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// User role for authorization.
///
/// Each role gates access to a distinct set of administration routes:
/// admins manage users, distributors manage products, clients manage
/// their own settings. `Default` is the unassigned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator - full access
    Admin,
    /// Distributor - product administration
    Distribuidor,
    /// Client - own settings only
    Cliente,
    /// Unassigned role
    Default,
}

impl Default for Role {
    fn default() -> Self {
        Self::Default
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Distribuidor => write!(f, "distribuidor"),
            Role::Cliente => write!(f, "cliente"),
            Role::Default => write!(f, "default"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "distribuidor" => Ok(Role::Distribuidor),
            "cliente" => Ok(Role::Cliente),
            "default" | "" => Ok(Role::Default),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    /// Display name
    pub full_name: String,
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// User role (optional, defaults to unassigned)
    #[serde(default)]
    pub role: Option<Role>,
    /// Date of birth
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    /// Postal address
    #[serde(default)]
    pub address: Option<String>,
    /// Phone number
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Gender
    #[serde(default)]
    pub gender: Option<String>,
    /// Terms of service acceptance
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Input for updating a user; unset fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// New plaintext password; re-hashed only when supplied
    pub password: Option<String>,
    pub role: Option<Role>,
    pub birthdate: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
}
