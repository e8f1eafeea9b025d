//! Authenticated API client for the chat-assistant backend.
//!
//! Every authenticated call goes through [`ApiClient::request_with_auth`],
//! which owns the credential lifecycle around a request:
//!
//! 1. refresh proactively when the stored credential is near expiry,
//! 2. attach the (possibly refreshed) credential as a bearer header,
//! 3. on a 401, refresh once and reissue the request exactly once.
//!
//! A request is never retried more than once, so a backend that keeps
//! rejecting freshly refreshed credentials surfaces as `Unauthorized`
//! instead of a retry loop.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{claims, RefreshCoordinator, TokenStore};
use crate::models::{ApiEnvelope, ChatHistory, ChatMessage, TokenResponse};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow assistant responses while failing fast enough for
/// an interactive client.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the chat-assistant backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: TokenStore,
    refresher: RefreshCoordinator,
    lookahead: ChronoDuration,
}

impl ApiClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        store: TokenStore,
        refresher: RefreshCoordinator,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            refresher,
            lookahead: claims::default_lookahead(),
        }
    }

    /// Override the near-expiry lookahead window.
    pub fn with_lookahead(mut self, lookahead: ChronoDuration) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// The HTTP client the rest of the app should share (connection pool,
    /// uniform timeout).
    pub fn default_http() -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request with the credential lifecycle handled around it.
    ///
    /// `build` is invoked once per attempt so the retry after a refresh is
    /// a genuinely fresh request carrying the new credential.
    async fn request_with_auth<F>(&self, build: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn(&Client) -> reqwest::RequestBuilder,
    {
        let mut token = self.store.get();
        if let Some(ref t) = token {
            if claims::is_near_expiry(t, self.lookahead) {
                debug!("credential near expiry, refreshing before request");
                if !self.refresher.refresh().await {
                    return Err(ApiError::AuthenticationRequired);
                }
                token = self.store.get();
            }
        }

        let response = self.send(build(&self.http), token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("request rejected with 401, attempting one refresh-and-retry");
        if !self.refresher.refresh().await {
            // The coordinator has already cleared the stored credential.
            return Err(ApiError::Unauthorized);
        }
        let token = self.store.get();
        self.send(build(&self.http), token.as_deref()).await
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let builder = match token {
            Some(t) => builder.bearer_auth(t),
            None => builder,
        };
        Ok(builder.send().await?)
    }

    /// Check the response status and parse the backend envelope.
    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("envelope parse: {e}")))
    }

    // ===== Endpoints =====

    /// Authenticate with email and password. On success the returned access
    /// token is persisted via the credential store.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        debug!(email, "attempting login");
        let response = self
            .http
            .post(self.endpoint("/api/auth/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // A 401 here means bad credentials, not a stale session - keep it
        // distinct from the post-refresh `Unauthorized`.
        if status == StatusCode::UNAUTHORIZED {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .map(|e| e.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "invalid email or password".to_string());
            return Err(ApiError::LoginRejected(message));
        }
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        let envelope: ApiEnvelope<TokenResponse> = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("envelope parse: {e}")))?;
        match envelope.data {
            Some(token) if envelope.is_success() && !token.access_token.is_empty() => {
                debug!("login succeeded, storing credential");
                self.store.set(&token.access_token);
                Ok(token)
            }
            _ => Err(ApiError::LoginRejected(envelope.message)),
        }
    }

    /// Send a chat message and return the backend's reply envelope.
    pub async fn send_message(
        &self,
        message: &str,
    ) -> Result<ApiEnvelope<serde_json::Value>, ApiError> {
        let url = self.endpoint("/api/chat/message");
        let response = self
            .request_with_auth(|http| http.post(&url).form(&[("message", message)]))
            .await?;
        Self::read_envelope(response).await
    }

    /// Fetch the stored chat history for the current user.
    pub async fn chat_history(&self) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.endpoint("/api/chat/history");
        let response = self.request_with_auth(|http| http.get(&url)).await?;
        let envelope: ApiEnvelope<ChatHistory> = Self::read_envelope(response).await?;
        Ok(envelope.data.map(|d| d.history).unwrap_or_default())
    }

    /// Unauthenticated backend health probe.
    pub async fn health(&self) -> Result<ApiEnvelope<serde_json::Value>, ApiError> {
        let response = self.http.get(self.endpoint("/api/health")).send().await?;
        Self::read_envelope(response).await
    }
}
