pub mod api;
pub mod config;
pub mod crm;
pub mod error;
pub mod estimate;
pub mod providers;
pub mod store;

pub use config::Config;
pub use error::AppError;

use std::sync::Arc;

use crm::JobberClient;
use providers::{JobberProvider, OAuthProvider};
use store::{TokenRefreshGuard, TokenRepository};

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TokenRepository>,
    pub provider: Arc<dyn OAuthProvider>,
    pub crm: JobberClient,
}

impl AppState {
    /// Wire the Jobber provider and GraphQL client around `store`.
    pub fn new(config: Config, store: Arc<dyn TokenRepository>) -> Self {
        let provider: Arc<dyn OAuthProvider> = Arc::new(JobberProvider::from_config(&config));
        let guard = TokenRefreshGuard::new(store.clone(), provider.clone());
        let crm = JobberClient::from_config(&config, guard);

        Self {
            config,
            store,
            provider,
            crm,
        }
    }
}

pub type SharedState = Arc<AppState>;
