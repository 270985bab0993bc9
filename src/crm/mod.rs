//! Jobber CRM integration: GraphQL transport, client matching and quotes.

pub mod client;
pub mod clients;
pub mod quotes;

pub use client::JobberClient;
pub use clients::{find_or_create_client, ClientLookup, ClientMatch, CrmClient, MatchedBy};
pub use quotes::{create_quote, Quote, QuoteRequest};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

/// Executes GraphQL operations against the CRM and returns the `data` field.
#[async_trait]
pub trait GraphQlExecutor: Send + Sync {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, AppError>;
}

/// Validation error reported inside a mutation payload.
#[derive(Debug, Deserialize)]
pub(crate) struct UserError {
    pub message: Option<String>,
}

/// Message of the first user error, if any were reported.
pub(crate) fn first_user_error(errors: Option<&[UserError]>) -> Option<String> {
    let first = errors?.first()?;
    Some(
        first
            .message
            .clone()
            .unwrap_or_else(|| "Jobber rejected the request".into()),
    )
}
