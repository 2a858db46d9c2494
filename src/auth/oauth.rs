//! GitHub OAuth code exchange
//!
//! The session subsystem consumes, but does not implement, the provider
//! side of OAuth. `OAuthProvider` is the seam: handlers and tests can
//! substitute any implementation. `GitHubOAuth` is the real one, trading an
//! authorization code for an access token and a user profile.
//!
//! Every network, HTTP or parse failure fails closed as `Exchange` — a
//! timeout is an authentication failure, never an implicit success.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Provider-side user profile returned by a successful exchange
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    /// Verified email address
    pub email: String,
    /// Display name (profile name, falling back to the login handle)
    pub name: String,
}

/// Errors from the provider boundary
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network, HTTP or parse failure talking to the provider
    #[error("OAuth exchange failed: {0}")]
    Exchange(String),

    /// The provider account has no verified primary email
    #[error("OAuth account has no verified email")]
    MissingEmail,
}

/// Third-party OAuth code-exchange boundary
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Exchange an authorization code for the provider-side user profile
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthError>;
}

/// GitHub OAuth implementation
pub struct GitHubOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    oauth_base: String,
    api_base: String,
}

/// Timeout for all provider calls; a hung provider must not hang login
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, serde::Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GitHubOAuth {
    /// Create a GitHub OAuth client from the configured application credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tienda")
            .timeout(EXCHANGE_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            oauth_base: "https://github.com".to_string(),
            api_base: "https://api.github.com".to_string(),
        })
    }

    /// Override the provider base URLs (tests)
    #[cfg(test)]
    pub fn with_base_urls(mut self, oauth_base: &str, api_base: &str) -> Self {
        self.oauth_base = oauth_base.to_string();
        self.api_base = api_base.to_string();
        self
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .client
            .post(format!("{}/login/oauth/access_token", self.oauth_base))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&AccessTokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::Exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("token response parse failed: {}", e)))?;

        body.access_token
            .ok_or_else(|| OAuthError::Exchange("no access token in response".to_string()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, OAuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(format!("user request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::Exchange(format!(
                "user endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("user response parse failed: {}", e)))
    }

    /// Fall back to the emails endpoint when the profile email is private
    async fn fetch_primary_email(&self, access_token: &str) -> Result<Option<String>, OAuthError> {
        let response = self
            .client
            .get(format!("{}/user/emails", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(format!("emails request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::Exchange(format!(
                "emails endpoint returned {}",
                response.status()
            )));
        }

        let emails: Vec<GitHubEmail> = response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("emails response parse failed: {}", e)))?;

        Ok(emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }
}

#[async_trait]
impl OAuthProvider for GitHubOAuth {
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let user = self.fetch_user(&access_token).await?;

        let email = match user.email {
            Some(email) => email,
            None => self
                .fetch_primary_email(&access_token)
                .await?
                .ok_or(OAuthError::MissingEmail)?,
        };

        let name = user.name.unwrap_or_else(|| user.login.clone());

        Ok(OAuthProfile { email, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_provider_fails_closed() {
        // TEST-NET-1 address; nothing listens there
        let oauth = GitHubOAuth::new("id", "secret")
            .unwrap()
            .with_base_urls("http://192.0.2.1:1", "http://192.0.2.1:1");

        let result = oauth.exchange_code("some-code").await;
        assert!(matches!(result, Err(OAuthError::Exchange(_))));
    }

    #[test]
    fn test_token_response_parsing() {
        let body: AccessTokenResponse =
            serde_json::from_str(r#"{"access_token":"gho_abc","token_type":"bearer"}"#).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("gho_abc"));

        // GitHub returns 200 with an error object on a bad code
        let body: AccessTokenResponse =
            serde_json::from_str(r#"{"error":"bad_verification_code"}"#).unwrap();
        assert!(body.access_token.is_none());
    }

    #[test]
    fn test_user_response_parsing() {
        let user: GitHubUser = serde_json::from_str(
            r#"{"login":"octocat","id":1,"name":"The Octocat","email":null}"#,
        )
        .unwrap();
        assert_eq!(user.login, "octocat");
        assert_eq!(user.name.as_deref(), Some("The Octocat"));
        assert!(user.email.is_none());
    }

    #[test]
    fn test_primary_verified_email_selection() {
        let emails: Vec<GitHubEmail> = serde_json::from_str(
            r#"[
                {"email":"old@example.com","primary":false,"verified":true},
                {"email":"unverified@example.com","primary":true,"verified":false},
                {"email":"main@example.com","primary":true,"verified":true}
            ]"#,
        )
        .unwrap();

        let selected = emails.into_iter().find(|e| e.primary && e.verified);
        assert_eq!(selected.unwrap().email, "main@example.com");
    }
}
