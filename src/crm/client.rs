//! Authenticated GraphQL client for the Jobber API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::GraphQlExecutor;
use crate::config::Config;
use crate::error::AppError;
use crate::providers::truncate;
use crate::store::TokenRefreshGuard;

const VERSION_HEADER: &str = "X-JOBBER-GRAPHQL-VERSION";

pub struct JobberClient {
    api_url: String,
    api_version: String,
    http: reqwest::Client,
    guard: TokenRefreshGuard,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: Option<String>,
}

impl JobberClient {
    pub fn new(api_url: String, api_version: String, guard: TokenRefreshGuard) -> Self {
        Self {
            api_url,
            api_version,
            http: reqwest::Client::new(),
            guard,
        }
    }

    pub fn from_config(config: &Config, guard: TokenRefreshGuard) -> Self {
        Self::new(
            config.jobber_api_url.clone(),
            config.jobber_api_version.clone(),
            guard,
        )
    }

    /// Run a query and return the whole response body, `errors` included.
    pub async fn execute_raw(&self, query: &str, variables: Value) -> Result<Value, AppError> {
        let (_, body) = self.post(query, variables).await?;
        Ok(body)
    }

    async fn post(&self, query: &str, variables: Value) -> Result<(StatusCode, Value), AppError> {
        let token = self
            .guard
            .ensure_fresh_token()
            .await
            .ok_or(AppError::NotConnected)?;

        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&token.access_token)
            .header(VERSION_HEADER, &self.api_version)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| AppError::Http(format!("GraphQL request failed: {e}")))?;

        let status = resp.status();
        debug!(status = status.as_u16(), "Received Jobber GraphQL response");

        // Jobber sometimes answers with an HTML error page, so read text first.
        let text = resp
            .text()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read GraphQL response: {e}")))?;

        let body: Value = serde_json::from_str(&text).map_err(|_| {
            warn!("Failed to parse GraphQL response: {}", truncate(&text, 200));
            AppError::InvalidResponse
        })?;

        Ok((status, body))
    }
}

#[async_trait]
impl GraphQlExecutor for JobberClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, AppError> {
        let (status, body) = self.post(query, variables).await?;

        let parsed: GraphQlResponse =
            serde_json::from_value(body).map_err(|_| AppError::InvalidResponse)?;

        if let Some(errors) = parsed.errors.filter(|errs| !errs.is_empty()) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.message.as_deref())
                .collect();
            error!("GraphQL errors: {}", messages.join("; "));
            let first = errors
                .into_iter()
                .next()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "GraphQL error".into());
            return Err(AppError::Crm(first));
        }

        if !status.is_success() {
            return Err(AppError::Crm(format!(
                "Jobber API returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(parsed.data.unwrap_or(Value::Null))
    }
}
