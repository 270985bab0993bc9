//! Token store for the Jobber OAuth connection.
//!
//! Exactly one token record exists at a time. `PgTokenStore` is the
//! production backend; `MemoryTokenStore` backs tests and local runs.

pub mod db;
pub mod memory;
pub mod refresh;

pub use db::PgTokenStore;
pub use memory::MemoryTokenStore;
pub use refresh::TokenRefreshGuard;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::providers::TokenSet;

/// Refresh this long before the recorded expiry.
pub const REFRESH_MARGIN_MS: i64 = 60_000;

/// The persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as epoch milliseconds.
    pub expires_at: i64,
}

impl TokenRecord {
    /// Build a record from a token grant received at `now_ms`.
    ///
    /// Falls back to `previous_refresh` when the grant carries no new
    /// refresh token.
    pub fn from_grant(tokens: TokenSet, previous_refresh: Option<&str>, now_ms: i64) -> Self {
        let refresh_token = tokens
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        let lifetime_ms = i64::try_from(tokens.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);

        Self {
            access_token: tokens.access_token,
            refresh_token,
            expires_at: now_ms.saturating_add(lifetime_ms),
        }
    }

    pub fn needs_refresh_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at - REFRESH_MARGIN_MS
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// Persistence for the single token record.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn load(&self) -> Result<Option<TokenRecord>, AppError>;

    /// Insert or replace the record.
    async fn save(&self, record: &TokenRecord) -> Result<(), AppError>;

    async fn delete(&self) -> Result<(), AppError>;
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
