//! Shared helpers for the core integration tests.
//!
//! Each test gets its own wiremock server standing in for the backend and
//! an in-memory session record, so nothing touches the real config, cache
//! or keychain.

// Not every test file uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use musicrec_core::auth::MemorySessionPersistence;
use musicrec_core::config::SessionBackend;
use musicrec_core::{Config, Services, UiEvent};
use wiremock::MockServer;

pub const REDIRECT_ORIGIN: &str = "http://127.0.0.1:3000";
pub const REDIRECT_URI: &str = "http://127.0.0.1:3000/callback";

/// Delay before a failed login returns to the login view, kept short for tests
pub const FAILURE_DELAY_MS: u64 = 20;

/// Persisted record of a signed-in user, as an earlier run would leave it.
pub fn signed_in_record(token: &str) -> String {
    serde_json::json!({
        "token": token,
        "user": {"userId": "1", "displayName": "Ann", "email": "a@x.com"},
        "saved_at": "2026-01-01T00:00:00Z"
    })
    .to_string()
}

pub fn exchange_success_body() -> serde_json::Value {
    serde_json::json!({
        "accessToken": "abc",
        "tokenType": "Bearer",
        "expiresIn": 3600,
        "userInfo": {"userId": "1", "displayName": "Ann", "email": "a@x.com"}
    })
}

pub struct TestHarness {
    pub server: MockServer,
    pub services: Services,
    pub persistence: Arc<MemorySessionPersistence>,
}

impl TestHarness {
    /// Harness with no session.
    pub async fn new() -> Self {
        Self::build(MemorySessionPersistence::default(), None).await
    }

    /// Harness whose startup finds a persisted session for `token`.
    pub async fn signed_in(token: &str) -> Self {
        Self::build(
            MemorySessionPersistence::with_contents(signed_in_record(token)),
            None,
        )
        .await
    }

    /// Harness with a custom request budget.
    pub async fn with_timeout_secs(secs: u64) -> Self {
        Self::build(MemorySessionPersistence::default(), Some(secs)).await
    }

    async fn build(persistence: MemorySessionPersistence, timeout_secs: Option<u64>) -> Self {
        let server = MockServer::start().await;
        let persistence = Arc::new(persistence);
        let config = Config {
            api_base_url: Some(format!("{}/api", server.uri())),
            client_id: Some("test-client".to_string()),
            redirect_origin: Some(REDIRECT_ORIGIN.to_string()),
            request_timeout_secs: timeout_secs.or(Some(5)),
            failure_redirect_delay_ms: Some(FAILURE_DELAY_MS),
            session_backend: SessionBackend::Memory,
            ..Default::default()
        };
        let services = Services::with_persistence(&config, persistence.clone())
            .expect("services build");

        Self {
            server,
            services,
            persistence,
        }
    }

    /// Everything the core has sent to the views so far.
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.services.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Let the delayed return-to-login fire.
    pub async fn wait_for_failure_redirect(&self) {
        tokio::time::sleep(Duration::from_millis(FAILURE_DELAY_MS * 5)).await;
    }
}

pub fn notice_messages(events: &[UiEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Notice(n) => Some(n.message.clone()),
            _ => None,
        })
        .collect()
}
