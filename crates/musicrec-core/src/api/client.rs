//! API client for communicating with the recommendation backend.
//!
//! Every call goes through `ApiClient::execute`, which decorates the
//! request with the current bearer token, sends it once, and classifies
//! the result. Nothing is retried here; retry policy belongs to callers.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::events::{Route, UiEvents};
use crate::models::{
    ExchangeRequest, ExchangeResponse, ExpandResult, FeedbackRequest, RecommendationBatch, Stats,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Dataset expansion is the slowest call and can take a few minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

const AUTH_CALLBACK_PATH: &str = "/auth/callback";
const AUTH_LOGOUT_PATH: &str = "/auth/logout";
const STATS_PATH: &str = "/stats";
const EXPAND_PATH: &str = "/expand";
const RECOMMEND_PATH: &str = "/recommend";
const RECOMMEND_NEXT_PATH: &str = "/recommend/next";
const RECOMMEND_PREVIOUS_PATH: &str = "/recommend/previous";
const FEEDBACK_PATH: &str = "/feedback";
const HEALTH_PATH: &str = "/health";

/// One outbound call: method, path relative to the API base, optional JSON body.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl RequestEnvelope {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn post(path: &str) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn with_json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("unserializable request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// API client for the recommendation backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
    events: UiEvents,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionStore,
        events: UiEvents,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer header from the session as it is right now. Never cached.
    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.session.token() {
            headers.insert(header::AUTHORIZATION, Self::bearer(&token)?);
        }
        Ok(headers)
    }

    fn bearer(token: &str) -> Result<header::HeaderValue, ApiError> {
        header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidResponse("token is not a valid header value".to_string()))
    }

    /// Send the request once and classify the outcome.
    ///
    /// Failures raise their notice here; `Unauthorized` additionally clears
    /// the session and sends the views back to login.
    pub async fn execute(&self, envelope: &RequestEnvelope) -> Result<String, ApiError> {
        let headers = self.auth_headers()?;
        let result = self.dispatch(envelope, headers).await;
        if let Err(ref err) = result {
            self.apply_side_effects(envelope, err);
        }
        result
    }

    async fn dispatch(
        &self,
        envelope: &RequestEnvelope,
        headers: header::HeaderMap,
    ) -> Result<String, ApiError> {
        debug!(method = %envelope.method, path = %envelope.path, "Sending request");

        let mut request = self
            .client
            .request(envelope.method.clone(), self.url(&envelope.path))
            .headers(headers);
        if let Some(ref body) = envelope.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_status(status, &body))
        }
    }

    fn apply_side_effects(&self, envelope: &RequestEnvelope, err: &ApiError) {
        warn!(method = %envelope.method, path = %envelope.path, error = %err, "Request failed");

        if err.is_unauthorized() {
            // Cleared here rather than via the auth flow so it takes effect
            // no matter which call site saw the 401
            self.session.clear();
            self.events.navigate(Route::Login);
        }
        if let Some(message) = err.notice() {
            self.events.error(message);
        }
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(&RequestEnvelope::get(path)).await?;
        Self::decode(path, &body)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.execute(&RequestEnvelope::post(path)).await?;
        Self::decode(path, &body)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let envelope = RequestEnvelope::post(path).with_json(body)?;
        let body = self.execute(&envelope).await?;
        Self::decode(path, &body)
    }

    // ===== Auth Endpoints =====

    /// Trade a one-time authorization code for a token and profile
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExchangeResponse, ApiError> {
        let body = ExchangeRequest { code, redirect_uri };
        self.post_json(AUTH_CALLBACK_PATH, &body).await
    }

    /// Tell the backend the session is over.
    ///
    /// Best effort: bypasses classification so a failure here never
    /// raises notices or touches the session.
    pub async fn notify_logout(&self, token: &str) -> Result<(), ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, Self::bearer(token)?);
        self.dispatch(&RequestEnvelope::post(AUTH_LOGOUT_PATH), headers)
            .await
            .map(|_| ())
    }

    // ===== Data Fetching Methods =====

    pub async fn fetch_stats(&self) -> Result<Stats, ApiError> {
        self.get(STATS_PATH).await
    }

    /// Import liked songs and similar tracks into the user's dataset
    pub async fn expand_dataset(&self) -> Result<ExpandResult, ApiError> {
        self.post(EXPAND_PATH).await
    }

    /// Generate a fresh batch of recommendations
    pub async fn fetch_recommendations(&self) -> Result<RecommendationBatch, ApiError> {
        self.post(RECOMMEND_PATH).await
    }

    pub async fn fetch_next_batch(&self) -> Result<RecommendationBatch, ApiError> {
        self.post(RECOMMEND_NEXT_PATH).await
    }

    pub async fn fetch_previous_batch(&self) -> Result<RecommendationBatch, ApiError> {
        self.post(RECOMMEND_PREVIOUS_PATH).await
    }

    /// Record a like/skip. Errors go back to the caller that triggered it.
    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> Result<(), ApiError> {
        let envelope = RequestEnvelope::post(FEEDBACK_PATH).with_json(feedback)?;
        self.execute(&envelope).await.map(|_| ())
    }

    /// Backend health document, or None if the backend is unreachable
    pub async fn health_check(&self) -> Option<serde_json::Value> {
        match self.execute(&RequestEnvelope::get(HEALTH_PATH)).await {
            Ok(body) => Some(
                serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
            ),
            Err(e) => {
                warn!(error = %e, "Health check failed");
                None
            }
        }
    }
}
