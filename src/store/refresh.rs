//! On-demand token refresh for the Jobber connection.
//!
//! There is no background timer: every CRM call goes through
//! [`TokenRefreshGuard::ensure_fresh_token`], which refreshes the stored
//! token when it is within a minute of expiry. A failed refresh deletes
//! the stored token so the user has to reconnect.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{now_ms, TokenRecord, TokenRepository};
use crate::providers::OAuthProvider;

pub struct TokenRefreshGuard {
    store: Arc<dyn TokenRepository>,
    provider: Arc<dyn OAuthProvider>,
    // Serializes refresh-and-persist within this process.
    refresh_lock: Mutex<()>,
}

impl TokenRefreshGuard {
    pub fn new(store: Arc<dyn TokenRepository>, provider: Arc<dyn OAuthProvider>) -> Self {
        Self {
            store,
            provider,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a usable token, refreshing it first if needed.
    ///
    /// `None` means "not connected".
    pub async fn ensure_fresh_token(&self) -> Option<TokenRecord> {
        self.ensure_fresh_token_at(now_ms()).await
    }

    /// Same as [`ensure_fresh_token`](Self::ensure_fresh_token) with an explicit clock.
    pub async fn ensure_fresh_token_at(&self, now: i64) -> Option<TokenRecord> {
        let record = self.load().await?;
        if !record.needs_refresh_at(now) {
            return Some(record);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited.
        let record = self.load().await?;
        if !record.needs_refresh_at(now) {
            return Some(record);
        }

        match self.provider.refresh_token(&record.refresh_token).await {
            Ok(tokens) => {
                let fresh = TokenRecord::from_grant(tokens, Some(&record.refresh_token), now);
                if let Err(e) = self.store.save(&fresh).await {
                    error!("Failed to persist refreshed {} token: {e}", self.provider.id());
                }
                info!("Refreshed {} access token", self.provider.id());
                Some(fresh)
            }
            Err(e) => {
                warn!(
                    "Token refresh for {} failed, disconnecting: {e}",
                    self.provider.id()
                );
                if let Err(e) = self.store.delete().await {
                    error!("Failed to delete stale token: {e}");
                }
                None
            }
        }
    }

    async fn load(&self) -> Option<TokenRecord> {
        match self.store.load().await {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to load stored token: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::providers::TokenSet;
    use crate::store::MemoryTokenStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000_000;

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OAuthProvider for CountingProvider {
        fn id(&self) -> &str {
            "test"
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        fn scopes(&self) -> Vec<String> {
            vec![]
        }

        fn auth_url(&self, _redirect_uri: &str) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenSet, AppError> {
            unreachable!("not used by the guard")
        }

        async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::OAuth("invalid_grant".into()));
            }
            assert_eq!(refresh_token, "rt-old");
            Ok(TokenSet {
                access_token: "at-new".into(),
                refresh_token: Some("rt-new".into()),
                token_type: "Bearer".into(),
                expires_in: 3600,
                scope: None,
            })
        }
    }

    fn stored(expires_at: i64) -> Arc<MemoryTokenStore> {
        Arc::new(MemoryTokenStore::with_record(TokenRecord {
            access_token: "at-old".into(),
            refresh_token: "rt-old".into(),
            expires_at,
        }))
    }

    #[tokio::test]
    async fn no_stored_token_is_not_connected() {
        let provider = Arc::new(CountingProvider::ok());
        let guard = TokenRefreshGuard::new(Arc::new(MemoryTokenStore::new()), provider.clone());

        assert!(guard.ensure_fresh_token_at(NOW).await.is_none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn refreshes_just_inside_the_margin() {
        let store = stored(NOW + 59_999);
        let provider = Arc::new(CountingProvider::ok());
        let guard = TokenRefreshGuard::new(store.clone(), provider.clone());

        let token = guard.ensure_fresh_token_at(NOW).await.expect("token");

        assert_eq!(provider.calls(), 1);
        assert_eq!(token.access_token, "at-new");
        assert_eq!(token.refresh_token, "rt-new");
        assert_eq!(token.expires_at, NOW + 3_600_000);
        assert_eq!(store.load().await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn leaves_token_alone_just_outside_the_margin() {
        let store = stored(NOW + 60_001);
        let provider = Arc::new(CountingProvider::ok());
        let guard = TokenRefreshGuard::new(store, provider.clone());

        let token = guard.ensure_fresh_token_at(NOW).await.expect("token");

        assert_eq!(provider.calls(), 0);
        assert_eq!(token.access_token, "at-old");
    }

    #[tokio::test]
    async fn failed_refresh_deletes_the_token() {
        let store = stored(NOW - 1);
        let provider = Arc::new(CountingProvider::failing());
        let guard = TokenRefreshGuard::new(store.clone(), provider.clone());

        assert!(guard.ensure_fresh_token_at(NOW).await.is_none());
        assert_eq!(provider.calls(), 1);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let store = stored(NOW - 1);
        let provider = Arc::new(CountingProvider::ok());
        let guard = Arc::new(TokenRefreshGuard::new(store, provider.clone()));

        let (a, b) = tokio::join!(
            guard.ensure_fresh_token_at(NOW),
            guard.ensure_fresh_token_at(NOW)
        );

        assert_eq!(provider.calls(), 1);
        assert_eq!(a.map(|t| t.access_token).as_deref(), Some("at-new"));
        assert_eq!(b.map(|t| t.access_token).as_deref(), Some("at-new"));
    }
}
