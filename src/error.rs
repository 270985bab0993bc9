use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the estimator service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Input Errors ────────────────────────────────────────────────────
    #[error("Bad request: {0}")]
    BadRequest(String),

    // ── Auth Errors ─────────────────────────────────────────────────────
    #[error("Not connected to Jobber")]
    NotConnected,

    #[error("OAuth error: {0}")]
    OAuth(String),

    // ── Upstream CRM Errors ─────────────────────────────────────────────
    #[error("{0}")]
    Crm(String),

    #[error("Invalid response from Jobber API")]
    InvalidResponse,

    #[error("HTTP error: {0}")]
    Http(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code carried in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::NotConnected => "not_connected",
            AppError::OAuth(_) => "oauth_error",
            AppError::Crm(_) => "crm_error",
            AppError::InvalidResponse => "invalid_response",
            AppError::Http(_) => "upstream_unavailable",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotConnected => StatusCode::UNAUTHORIZED,
            AppError::OAuth(_) => StatusCode::BAD_GATEWAY,
            AppError::Crm(_)
            | AppError::InvalidResponse
            | AppError::Http(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the browser. Transport, database and
    /// internal details stay in the server log.
    fn public_message(&self) -> String {
        match self {
            AppError::Http(_) => "Jobber API is unreachable".into(),
            AppError::Database(_) => "Database unavailable".into(),
            AppError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AppError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{self}");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
