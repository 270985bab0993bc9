use anyhow::{Context, Result};

pub const DEFAULT_AUTHORIZE_URL: &str = "https://api.getjobber.com/api/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.getjobber.com/api/oauth/token";
pub const DEFAULT_API_URL: &str = "https://api.getjobber.com/api/graphql";
pub const DEFAULT_API_VERSION: &str = "2025-04-16";

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Public URL of this deployment; OAuth redirects and post-connect
    /// redirects are built from it.
    pub base_url: String,

    // ── Database ────────────────────────────────────────────────────────
    pub database_url: String,

    // ── Jobber ──────────────────────────────────────────────────────────
    pub jobber_client_id: String,
    pub jobber_client_secret: String,
    pub jobber_authorize_url: String,
    pub jobber_token_url: String,
    pub jobber_api_url: String,
    /// Sent as `X-JOBBER-GRAPHQL-VERSION` on every GraphQL call.
    pub jobber_api_version: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = resolve_base_url(
            std::env::var("BASE_URL").ok(),
            std::env::var("VERCEL_URL").ok(),
        );

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .context("Invalid PORT")?,
            base_url: base_url.trim_end_matches('/').to_string(),

            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL is required (PostgreSQL connection string)")?,

            jobber_client_id: std::env::var("JOBBER_CLIENT_ID")
                .context("JOBBER_CLIENT_ID is required")?,
            jobber_client_secret: std::env::var("JOBBER_CLIENT_SECRET")
                .context("JOBBER_CLIENT_SECRET is required")?,
            jobber_authorize_url: std::env::var("JOBBER_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_AUTHORIZE_URL.into()),
            jobber_token_url: std::env::var("JOBBER_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.into()),
            jobber_api_url: std::env::var("JOBBER_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into()),
            jobber_api_version: std::env::var("JOBBER_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.into()),
        })
    }

    /// OAuth callback URL registered with Jobber.
    pub fn callback_url(&self) -> String {
        format!("{}/api/auth/jobber/callback", self.base_url)
    }

    /// App root with a query string, used for every post-OAuth redirect.
    pub fn app_url(&self, query: &str) -> String {
        format!("{}/?{}", self.base_url, query)
    }
}

/// An explicit `BASE_URL` takes precedence over the Vercel deployment host.
fn resolve_base_url(base_url: Option<String>, vercel_host: Option<String>) -> String {
    match (base_url, vercel_host) {
        (Some(url), _) => url,
        (None, Some(host)) => format!("https://{host}"),
        (None, None) => "http://localhost:5000".into(),
    }
}
