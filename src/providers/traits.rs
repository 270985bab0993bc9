use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;

/// A set of tokens returned from the CRM after code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Lifetime in seconds. Providers fill in their default TTL when the
    /// token endpoint omits it.
    pub expires_in: u64,
    pub scope: Option<String>,
}

/// Trait implemented by the OAuth provider backing the CRM integration.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier (e.g., "jobber").
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Fixed scope list requested on every authorization.
    fn scopes(&self) -> Vec<String>;

    /// Build the authorization URL that the user should be redirected to.
    ///
    /// No `state` parameter is sent.
    fn auth_url(&self, redirect_uri: &str) -> String;

    /// Exchange an authorization code for an access and refresh token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, AppError>;

    /// Obtain a new access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError>;

    /// Lifetime assumed when the token endpoint does not send `expires_in`.
    fn token_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }
}
