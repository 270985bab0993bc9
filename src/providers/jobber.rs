use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::traits::{OAuthProvider, TokenSet};
use crate::config::Config;
use crate::error::AppError;

const SCOPES: &[&str] = &["read_clients", "write_clients", "read_quotes", "write_quotes"];

/// Jobber OAuth 2.0 provider.
///
/// Quirks:
/// - Token endpoint takes client credentials in the form body.
/// - Errors come back as JSON `{error, error_description}`, sometimes with a 200.
/// - `expires_in` is not always present; tokens live about an hour.
pub struct JobberProvider {
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    http: reqwest::Client,
}

// Raw token response from Jobber's token endpoint
#[derive(Debug, Deserialize)]
struct JobberTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl JobberProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        authorize_url: String,
        token_url: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            authorize_url,
            token_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jobber_client_id.clone(),
            config.jobber_client_secret.clone(),
            config.jobber_authorize_url.clone(),
            config.jobber_token_url.clone(),
        )
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, AppError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Http(format!("Token request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read token response: {e}")))?;

        let token_resp: JobberTokenResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(AppError::OAuth(format!(
                    "token endpoint returned HTTP {}",
                    status.as_u16()
                )));
            }
            Err(_) => {
                warn!("Unparseable token response: {}", truncate(&body, 200));
                return Err(AppError::InvalidResponse);
            }
        };

        if let Some(error) = token_resp.error {
            return Err(AppError::OAuth(token_resp.error_description.unwrap_or(error)));
        }

        if !status.is_success() {
            return Err(AppError::OAuth(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let access_token = token_resp.access_token.ok_or(AppError::InvalidResponse)?;

        Ok(TokenSet {
            access_token,
            refresh_token: token_resp.refresh_token,
            token_type: token_resp.token_type.unwrap_or_else(|| "Bearer".into()),
            expires_in: token_resp
                .expires_in
                .unwrap_or_else(|| self.token_ttl().as_secs()),
            scope: token_resp.scope,
        })
    }
}

#[async_trait]
impl OAuthProvider for JobberProvider {
    fn id(&self) -> &str {
        "jobber"
    }

    fn display_name(&self) -> &str {
        "Jobber"
    }

    fn scopes(&self) -> Vec<String> {
        SCOPES.iter().map(|s| s.to_string()).collect()
    }

    fn auth_url(&self, redirect_uri: &str) -> String {
        let scope_str = self.scopes().join(" ");
        format!(
            "{base}?client_id={client_id}\
             &redirect_uri={redirect_uri}\
             &response_type=code\
             &scope={scope}",
            base = self.authorize_url,
            client_id = urlencoding(&self.client_id),
            redirect_uri = urlencoding(redirect_uri),
            scope = urlencoding(&scope_str),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, AppError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
    }
}

fn urlencoding(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Cut a body down for logging without splitting a UTF-8 character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> JobberProvider {
        JobberProvider::new(
            "client-123".into(),
            "s3cret".into(),
            "https://api.getjobber.com/api/oauth/authorize".into(),
            format!("{}/api/oauth/token", server.uri()),
        )
    }

    #[tokio::test]
    async fn auth_url_carries_client_redirect_and_scopes() {
        let server = MockServer::start().await;
        let url = provider(&server).auth_url("https://app.example.com/api/auth/jobber/callback");

        assert!(url.starts_with("https://api.getjobber.com/api/oauth/authorize?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fapp.example.com%2Fapi%2Fauth%2Fjobber%2Fcallback"
        ));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=read_clients+write_clients+read_quotes+write_quotes"));
        assert!(!url.contains("state="));
    }

    #[tokio::test]
    async fn exchange_code_posts_form_and_parses_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "expires_in": 7200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = provider(&server)
            .exchange_code("abc", "http://localhost/cb")
            .await
            .expect("exchange should succeed");

        assert_eq!(tokens.access_token, "at-1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(tokens.expires_in, 7200);
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[tokio::test]
    async fn missing_expires_in_defaults_to_an_hour() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-2",
                "refresh_token": "rt-2"
            })))
            .mount(&server)
            .await;

        let tokens = provider(&server).refresh_token("rt-1").await.unwrap();
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn error_description_is_preferred_over_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The authorization code has expired"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .exchange_code("stale", "http://localhost/cb")
            .await
            .unwrap_err();

        match err {
            AppError::OAuth(msg) => assert_eq!(msg, "The authorization code has expired"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn html_body_is_an_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).refresh_token("rt").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }
}
