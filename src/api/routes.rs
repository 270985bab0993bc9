//! API route handlers for the estimator service.
//!
//! All handlers receive `SharedState` via Axum state extraction. CRM
//! failures surface through `AppError`; the OAuth callback is the one
//! exception and always answers with a redirect.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::crm::{self, ClientLookup, ClientMatch, Quote, QuoteRequest};
use crate::error::AppError;
use crate::estimate::{self, Estimate, EstimateInputs};
use crate::store::{now_ms, TokenRecord};
use crate::SharedState;

const DEFAULT_INTROSPECT_TYPE: &str = "PropertyCreateInput";

const INTROSPECT_TYPE: &str = r#"
    query IntrospectType($typeName: String!) {
        __type(name: $typeName) {
            name
            kind
            inputFields {
                name
                type {
                    name
                    kind
                    ofType {
                        name
                        kind
                        ofType {
                            name
                            kind
                        }
                    }
                }
            }
        }
    }
"#;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/health", get(health))
        // ── OAuth ────────────────────────────────────────────────────────
        .route("/auth/jobber", get(jobber_authorize))
        .route("/auth/jobber/callback", get(jobber_callback))
        // ── Jobber ───────────────────────────────────────────────────────
        .route("/jobber/status", get(jobber_status))
        .route("/jobber/disconnect", post(jobber_disconnect))
        .route("/jobber/find-or-create-client", post(find_or_create_client))
        .route("/jobber/create-quote", post(create_quote))
        .route("/jobber/introspect", get(introspect))
        // ── Estimator ────────────────────────────────────────────────────
        .route("/estimate", post(price_estimate))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// OAuth
// =============================================================================

/// GET /api/auth/jobber - Send the browser to Jobber's consent screen.
async fn jobber_authorize(State(state): State<SharedState>) -> Redirect {
    let url = state.provider.auth_url(&state.config.callback_url());
    Redirect::temporary(&url)
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// GET /api/auth/jobber/callback - Finish the OAuth handshake.
///
/// Every outcome is a redirect back to the app root with a query flag.
async fn jobber_callback(
    State(state): State<SharedState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Redirect {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => {
            warn!("Malformed OAuth callback query: {}", rejection.body_text());
            return redirect_with_error(&state, "connection_failed");
        }
    };

    if let Some(err) = q.error.as_deref().filter(|e| !e.is_empty()) {
        warn!("Jobber authorization denied: {err}");
        return redirect_with_error(&state, err);
    }

    let Some(code) = q.code.as_deref().filter(|c| !c.is_empty()) else {
        return redirect_with_error(&state, "no_code");
    };

    let tokens = match state
        .provider
        .exchange_code(code, &state.config.callback_url())
        .await
    {
        Ok(tokens) => tokens,
        Err(AppError::OAuth(description)) => {
            error!("Token exchange rejected: {description}");
            return redirect_with_error(&state, &description);
        }
        Err(e) => {
            error!("Token exchange failed: {e}");
            return redirect_with_error(&state, "connection_failed");
        }
    };

    let record = TokenRecord::from_grant(tokens, None, now_ms());
    if let Err(e) = state.store.save(&record).await {
        error!("Failed to store Jobber tokens: {e}");
        return redirect_with_error(&state, "connection_failed");
    }

    info!("Connected to {}", state.provider.display_name());
    Redirect::temporary(&state.config.app_url("jobber_connected=true"))
}

fn redirect_with_error(state: &SharedState, reason: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(reason.as_bytes()).collect();
    Redirect::temporary(&state.config.app_url(&format!("jobber_error={encoded}")))
}

// =============================================================================
// Jobber Connection
// =============================================================================

/// GET /api/jobber/status - Whether an unexpired token is stored.
async fn jobber_status(State(state): State<SharedState>) -> Json<Value> {
    let connected = match state.store.load().await {
        Ok(Some(record)) => !record.is_expired_at(now_ms()),
        Ok(None) => false,
        Err(e) => {
            warn!("Token lookup failed: {e}");
            false
        }
    };

    Json(json!({ "connected": connected }))
}

/// POST /api/jobber/disconnect - Forget the stored token.
async fn jobber_disconnect(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    state.store.delete().await?;
    info!("Disconnected from Jobber");
    Ok(Json(json!({ "success": true })))
}

/// POST /api/jobber/find-or-create-client
async fn find_or_create_client(
    State(state): State<SharedState>,
    payload: Result<Json<ClientLookup>, JsonRejection>,
) -> Result<Json<ClientMatch>, AppError> {
    let Json(lookup) = payload?;
    let matched = crm::find_or_create_client(&state.crm, &lookup).await?;
    Ok(Json(matched))
}

#[derive(serde::Serialize)]
struct QuoteResponse {
    quote: Quote,
}

/// POST /api/jobber/create-quote
async fn create_quote(
    State(state): State<SharedState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, AppError> {
    let Json(req) = payload?;
    let quote = crm::create_quote(&state.crm, &req).await?;
    Ok(Json(QuoteResponse { quote }))
}

#[derive(Deserialize)]
struct IntrospectQuery {
    #[serde(rename = "type")]
    type_name: Option<String>,
}

/// GET /api/jobber/introspect - Raw `__type` lookup against the Jobber schema.
async fn introspect(
    State(state): State<SharedState>,
    query: Result<Query<IntrospectQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(q) = query?;
    let type_name = q
        .type_name
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_INTROSPECT_TYPE.into());

    let body = state
        .crm
        .execute_raw(INTROSPECT_TYPE, json!({ "typeName": type_name }))
        .await?;
    Ok(Json(body))
}

// =============================================================================
// Estimator
// =============================================================================

/// POST /api/estimate - Price a job from its areas and cost inputs.
async fn price_estimate(
    payload: Result<Json<EstimateInputs>, JsonRejection>,
) -> Result<Json<Estimate>, AppError> {
    let Json(inputs) = payload?;
    Ok(Json(estimate::calculate(&inputs)))
}
