//! User service
//!
//! Business logic for accounts and authentication: registration with
//! field-scoped validation, credential login, GitHub OAuth upsert, and the
//! administration CRUD behind the users screens.
//!
//! Login failures are deliberately uniform. Unknown email, wrong password
//! and soft-deleted account all produce the same `InvalidCredentials`, so
//! the endpoint cannot be used to probe which emails are registered.

use crate::auth::oauth::OAuthProfile;
use crate::auth::password::{hash_password, verify_password};
use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, Role, UpdateUserInput, User};
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

/// Stand-in hash verified against when an email has no live account, so the
/// miss path costs the same hashing work as a real verification.
static PHANTOM_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("phantom-credential").unwrap_or_default());

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed; one message for every credential failure
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Input validation failed; maps field name to message
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    /// Email already registered
    #[error("Email '{0}' is already registered")]
    EmailExists(String),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User service for account management and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service with the given repository
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a new account with local credentials.
    ///
    /// Validates every field and reports all failures at once, then checks
    /// email uniqueness and stores the hashed credential. New accounts get
    /// the unassigned role; role assignment is an admin operation.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let mut errors = BTreeMap::new();
        validate_full_name(&input.full_name, &mut errors);
        validate_email(&input.email, &mut errors);
        validate_password(&input.password, &mut errors);
        if !input.terms_accepted {
            errors.insert(
                "terms_accepted".to_string(),
                "You must accept the terms of service".to_string(),
            );
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        // Soft-deleted rows still hold their email, so check all rows
        if self
            .user_repo
            .email_in_use(&input.email)
            .await
            .context("Failed to check email")?
        {
            return Err(UserServiceError::EmailExists(input.email));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(input.full_name, input.email, password_hash, Role::Default);
        user.terms_accepted = true;

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Authenticate with email and password.
    ///
    /// Returns the user on success. Every failure path is
    /// `InvalidCredentials`; soft-deleted accounts are invisible here
    /// because the repository lookup excludes them.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let user = match self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?
        {
            Some(user) => user,
            None => {
                // Burn the same hashing cost as a real verification so the
                // miss path cannot be told apart by response time
                let _ = verify_password(password, &PHANTOM_HASH);
                return Err(UserServiceError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Log in (or provision) an account from a completed OAuth exchange.
    ///
    /// Upsert by email: an existing account is returned untouched, in
    /// particular its password hash is never modified. A missing account is
    /// created as a client with a throwaway credential hash that no login
    /// attempt can ever match.
    pub async fn login_github(&self, profile: OAuthProfile) -> Result<User, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_email(&profile.email)
            .await
            .context("Failed to get user by email")?
        {
            return Ok(user);
        }

        // A retired account may still hold the email; never resurrect it
        if self
            .user_repo
            .email_in_use(&profile.email)
            .await
            .context("Failed to check email")?
        {
            return Err(UserServiceError::EmailExists(profile.email));
        }

        let throwaway = hash_password(&Uuid::new_v4().to_string())
            .context("Failed to hash placeholder credential")?;

        let mut user = User::new(profile.name, profile.email, throwaway, Role::Cliente);
        user.terms_accepted = true;

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create OAuth user")?;

        tracing::info!(user_id = created.id, "Provisioned account via GitHub OAuth");

        Ok(created)
    }

    /// Look up the account behind a session's user id.
    ///
    /// Soft-deleted accounts resolve to `None`, so a session issued before
    /// deletion stops working on its next request.
    pub async fn current_user(&self, user_id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// List live users with pagination, returning (users, total)
    pub async fn list_users(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<User>, i64), UserServiceError> {
        let result = self
            .user_repo
            .list(page, per_page)
            .await
            .context("Failed to list users")?;

        Ok(result)
    }

    /// Create a user from the administration screen; honors the given role
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let mut errors = BTreeMap::new();
        validate_full_name(&input.full_name, &mut errors);
        validate_email(&input.email, &mut errors);
        validate_password(&input.password, &mut errors);
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        if self
            .user_repo
            .email_in_use(&input.email)
            .await
            .context("Failed to check email")?
        {
            return Err(UserServiceError::EmailExists(input.email));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(
            input.full_name,
            input.email,
            password_hash,
            input.role.unwrap_or_default(),
        );
        user.birthdate = input.birthdate;
        user.address = input.address;
        user.phone_number = input.phone_number;
        user.gender = input.gender;
        user.terms_accepted = input.terms_accepted;

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Update a user; unset fields keep their current value.
    ///
    /// The password is re-hashed only when a new one is supplied.
    pub async fn update_user(
        &self,
        id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        let mut errors = BTreeMap::new();
        if let Some(ref name) = input.full_name {
            validate_full_name(name, &mut errors);
        }
        if let Some(ref email) = input.email {
            validate_email(email, &mut errors);
        }
        if let Some(ref password) = input.password {
            validate_password(password, &mut errors);
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        if let Some(email) = input.email {
            if email != user.email {
                if self
                    .user_repo
                    .email_in_use(&email)
                    .await
                    .context("Failed to check email")?
                {
                    return Err(UserServiceError::EmailExists(email));
                }
                user.email = email;
            }
        }
        if let Some(name) = input.full_name {
            user.full_name = name;
        }
        if let Some(password) = input.password {
            user.password_hash =
                hash_password(&password).context("Failed to hash password")?;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(birthdate) = input.birthdate {
            user.birthdate = Some(birthdate);
        }
        if let Some(address) = input.address {
            user.address = Some(address);
        }
        if let Some(phone) = input.phone_number {
            user.phone_number = Some(phone);
        }
        if let Some(gender) = input.gender {
            user.gender = Some(gender);
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        Ok(updated)
    }

    /// Update a user's own profile; the role field is ignored even if sent
    pub async fn update_profile(
        &self,
        id: i64,
        mut input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        input.role = None;
        self.update_user(id, input).await
    }

    /// Soft-delete a user account
    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        self.user_repo
            .soft_delete(id)
            .await
            .context("Failed to delete user")?;

        Ok(())
    }
}

/// Input for self-service registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

fn validate_full_name(name: &str, errors: &mut BTreeMap<String, String>) {
    if name.trim().chars().count() < 2 {
        errors.insert(
            "full_name".to_string(),
            "Name must be at least 2 characters".to_string(),
        );
    }
}

fn validate_email(email: &str, errors: &mut BTreeMap<String, String>) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.insert("email".to_string(), "Invalid email address".to_string());
    }
}

fn validate_password(password: &str, errors: &mut BTreeMap<String, String>) {
    if password.chars().count() < 8 {
        errors.insert(
            "password".to_string(),
            "Password must be at least 8 characters".to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(SqlxUserRepository::boxed(pool.clone()));

        (pool, service)
    }

    fn register_input(name: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            full_name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            terms_accepted: true,
        }
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[tokio::test]
    async fn test_register_success() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .expect("Failed to register");

        assert!(user.id > 0);
        assert_eq!(user.full_name, "Test User");
        assert_eq!(user.email, "test@test.com");
        assert_eq!(user.role, Role::Default);
        assert!(user.terms_accepted);
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .expect("Failed to register");

        assert_ne!(user.password_hash, "Abcd123!");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let (_pool, service) = setup_test_service().await;

        service
            .register(register_input("User One", "same@example.com", "password1"))
            .await
            .expect("First registration should work");

        let result = service
            .register(register_input("User Two", "same@example.com", "password2"))
            .await;

        assert!(matches!(result, Err(UserServiceError::EmailExists(_))));
    }

    #[tokio::test]
    async fn test_register_with_deleted_account_email_conflicts() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("First Owner", "taken@example.com", "password1"))
            .await
            .unwrap();
        service.delete_user(user.id).await.unwrap();

        // The row still holds the email under its UNIQUE index, so this must
        // be a conflict rather than a constraint blowup
        let result = service
            .register(register_input("Second Owner", "taken@example.com", "password2"))
            .await;

        assert!(matches!(result, Err(UserServiceError::EmailExists(_))));
    }

    #[tokio::test]
    async fn test_register_validation_collects_all_fields() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .register(RegisterInput {
                full_name: "X".to_string(),
                email: "not-an-email".to_string(),
                password: "short".to_string(),
                terms_accepted: false,
            })
            .await;

        match result {
            Err(UserServiceError::Validation(errors)) => {
                assert!(errors.contains_key("full_name"));
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("password"));
                assert!(errors.contains_key("terms_accepted"));
            }
            other => panic!("Expected validation error, got {:?}", other.map(|u| u.id)),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_email_without_domain_dot() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .register(register_input("Valid Name", "user@localhost", "password123"))
            .await;

        assert!(matches!(result, Err(UserServiceError::Validation(_))));
    }

    // ========================================================================
    // Login tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_success() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        let user = service
            .login("test@test.com", "Abcd123!")
            .await
            .expect("Login should succeed");

        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        let result = service.login("test@test.com", "Abcd123?").await;

        assert!(matches!(result, Err(UserServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_email_fails() {
        let (_pool, service) = setup_test_service().await;

        let result = service.login("nobody@example.com", "password123").await;

        assert!(matches!(result, Err(UserServiceError::InvalidCredentials)));
    }

    #[test]
    fn test_phantom_hash_is_a_real_argon2_hash() {
        // The miss path must verify against a genuine hash to cost the same
        assert!(PHANTOM_HASH.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        let wrong_password = service
            .login("test@test.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown_email = service
            .login("nobody@example.com", "Abcd123!")
            .await
            .unwrap_err();

        service.delete_user(user.id).await.unwrap();
        let deleted_account = service.login("test@test.com", "Abcd123!").await.unwrap_err();

        // Same message for all three; no enumeration oracle
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(unknown_email.to_string(), deleted_account.to_string());
    }

    // ========================================================================
    // OAuth upsert tests
    // ========================================================================

    fn github_profile(email: &str, name: &str) -> OAuthProfile {
        OAuthProfile {
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_github_creates_cliente_account() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .login_github(github_profile("octo@example.com", "The Octocat"))
            .await
            .expect("OAuth login should succeed");

        assert!(user.id > 0);
        assert_eq!(user.role, Role::Cliente);
        assert_eq!(user.full_name, "The Octocat");
        assert!(user.terms_accepted);
    }

    #[tokio::test]
    async fn test_login_github_is_idempotent() {
        let (_pool, service) = setup_test_service().await;

        let first = service
            .login_github(github_profile("octo@example.com", "The Octocat"))
            .await
            .unwrap();
        let second = service
            .login_github(github_profile("octo@example.com", "The Octocat"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_login_github_never_overwrites_password_hash() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Local User", "local@example.com", "Abcd123!"))
            .await
            .unwrap();

        let via_oauth = service
            .login_github(github_profile("local@example.com", "Renamed"))
            .await
            .unwrap();

        assert_eq!(via_oauth.id, registered.id);
        assert_eq!(via_oauth.password_hash, registered.password_hash);
        // Profile fields are untouched too
        assert_eq!(via_oauth.full_name, "Local User");

        // Password login still works after the OAuth round
        service
            .login("local@example.com", "Abcd123!")
            .await
            .expect("Password login should survive OAuth");
    }

    #[tokio::test]
    async fn test_login_github_with_deleted_account_email_fails_cleanly() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(register_input("Gone User", "gone@example.com", "password1"))
            .await
            .unwrap();
        service.delete_user(user.id).await.unwrap();

        let result = service
            .login_github(github_profile("gone@example.com", "Gone User"))
            .await;

        // Neither a resurrected account nor an internal failure
        assert!(matches!(result, Err(UserServiceError::EmailExists(_))));
        assert!(service
            .current_user(user.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_oauth_throwaway_credential_never_matches() {
        let (_pool, service) = setup_test_service().await;

        service
            .login_github(github_profile("octo@example.com", "The Octocat"))
            .await
            .unwrap();

        // No password can log into an OAuth-provisioned account
        for guess in ["", "password", "octo@example.com"] {
            let result = service.login("octo@example.com", guess).await;
            assert!(matches!(result, Err(UserServiceError::InvalidCredentials)));
        }
    }

    // ========================================================================
    // Current-user tests
    // ========================================================================

    #[tokio::test]
    async fn test_current_user() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        let user = service
            .current_user(registered.id)
            .await
            .unwrap()
            .expect("User should exist");

        assert_eq!(user.email, "test@test.com");
    }

    #[tokio::test]
    async fn test_current_user_deleted_resolves_none() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        service.delete_user(registered.id).await.unwrap();

        let user = service.current_user(registered.id).await.unwrap();
        assert!(user.is_none());
    }

    // ========================================================================
    // Admin CRUD tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_user_honors_role() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .create_user(CreateUserInput {
                full_name: "Dist User".to_string(),
                email: "dist@example.com".to_string(),
                password: "password123".to_string(),
                role: Some(Role::Distribuidor),
                birthdate: None,
                address: None,
                phone_number: None,
                gender: None,
                terms_accepted: true,
            })
            .await
            .expect("Failed to create user");

        assert_eq!(user.role, Role::Distribuidor);
    }

    #[tokio::test]
    async fn test_update_user_rehashes_only_when_password_supplied() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        // Update without password keeps the hash
        let updated = service
            .update_user(
                registered.id,
                UpdateUserInput {
                    full_name: Some("New Name".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.password_hash, registered.password_hash);
        assert_eq!(updated.full_name, "New Name");

        // Update with password replaces it
        let updated = service
            .update_user(
                registered.id,
                UpdateUserInput {
                    password: Some("NewPass123!".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(updated.password_hash, registered.password_hash);

        service
            .login("test@test.com", "NewPass123!")
            .await
            .expect("New password should work");
        assert!(matches!(
            service.login("test@test.com", "Abcd123!").await,
            Err(UserServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_user_duplicate_email_fails() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(register_input("User A", "a@example.com", "password123"))
            .await
            .unwrap();
        let user_b = service
            .register(register_input("User B", "b@example.com", "password123"))
            .await
            .unwrap();

        let result = service
            .update_user(
                user_b.id,
                UpdateUserInput {
                    email: Some("a@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::EmailExists(_))));
    }

    #[tokio::test]
    async fn test_update_user_to_deleted_account_email_conflicts() {
        let (_pool, service) = setup_test_service().await;
        let retired = service
            .register(register_input("Retired", "retired@example.com", "password1"))
            .await
            .unwrap();
        service.delete_user(retired.id).await.unwrap();
        let active = service
            .register(register_input("Active", "active@example.com", "password1"))
            .await
            .unwrap();

        let result = service
            .update_user(
                active.id,
                UpdateUserInput {
                    email: Some("retired@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::EmailExists(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let (_pool, service) = setup_test_service().await;

        let result = service
            .update_user(
                999,
                UpdateUserInput {
                    full_name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(UserServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_profile_ignores_role() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(register_input("Test User", "test@test.com", "Abcd123!"))
            .await
            .unwrap();

        let updated = service
            .update_profile(
                registered.id,
                UpdateUserInput {
                    role: Some(Role::Admin),
                    address: Some("456 Oak Ave".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Default);
        assert_eq!(updated.address.as_deref(), Some("456 Oak Ave"));
    }

    #[tokio::test]
    async fn test_list_users_pagination() {
        let (_pool, service) = setup_test_service().await;

        for i in 0..4 {
            service
                .register(register_input(
                    &format!("User {}", i),
                    &format!("user{}@example.com", i),
                    "password123",
                ))
                .await
                .unwrap();
        }

        let (users, total) = service.list_users(1, 3).await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let (_pool, service) = setup_test_service().await;

        let result = service.delete_user(999).await;

        assert!(matches!(result, Err(UserServiceError::NotFound)));
    }
}
