//! Request decoration and failure classification against a mock backend.

mod common;

use std::sync::Arc;

use common::{notice_messages, signed_in_record, TestHarness};
use musicrec_core::auth::{FileSessionPersistence, MemorySessionPersistence};
use musicrec_core::models::{FeedbackRequest, Track};
use musicrec_core::{ApiError, AuthState, Config, Route, Services, UiEvent};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_unauthorized_clears_session_and_returns_to_login() {
    let mut h = TestHarness::signed_in("stale").await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.services.api.fetch_stats().await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    let ctx = &h.services.session;
    assert!(!ctx.is_authenticated());
    assert!(ctx.current_user().is_none());
    assert_eq!(ctx.auth_state(), AuthState::Anonymous);
    assert!(h.persistence.contents().is_none());

    let events = h.drain_events();
    assert!(events.contains(&UiEvent::Navigate(Route::Login)));
    assert_eq!(
        notice_messages(&events),
        vec!["Session expired. Please log in again.".to_string()]
    );
}

#[tokio::test]
async fn test_rate_limited_is_not_retried() {
    let mut h = TestHarness::signed_in("abc").await;

    Mock::given(method("POST"))
        .and(path("/api/recommend"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.services.api.fetch_recommendations().await;

    assert!(matches!(result, Err(ApiError::RateLimited)));
    assert!(h.services.session.is_authenticated());
    assert_eq!(
        notice_messages(&h.drain_events()),
        vec!["Too many requests. Please wait a moment.".to_string()]
    );
    h.server.verify().await;
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let mut h = TestHarness::signed_in("abc").await;

    Mock::given(method("POST"))
        .and(path("/api/expand"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&h.server)
        .await;

    let result = h.services.api.expand_dataset().await;

    assert!(matches!(result, Err(ApiError::ServerError(ref body)) if body.contains("maintenance")));
    assert!(h.services.session.is_authenticated());
    assert_eq!(
        notice_messages(&h.drain_events()),
        vec!["Server error. Please try again later.".to_string()]
    );
}

#[tokio::test]
async fn test_client_error_is_left_to_caller() {
    let mut h = TestHarness::signed_in("abc").await;

    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad track"))
        .mount(&h.server)
        .await;

    let track = Track {
        track_name: "Song".to_string(),
        artist: "Band".to_string(),
        ..Default::default()
    };
    let result = h
        .services
        .api
        .submit_feedback(&FeedbackRequest::for_track(&track, true))
        .await;

    assert!(matches!(
        result,
        Err(ApiError::RequestFailed { status: 400, ref body }) if body == "bad track"
    ));
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let mut h = TestHarness::with_timeout_secs(1).await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(std::time::Duration::from_millis(1500)),
        )
        .mount(&h.server)
        .await;

    let result = h.services.api.fetch_stats().await;

    assert!(matches!(result, Err(ApiError::Timeout)));
    assert_eq!(
        notice_messages(&h.drain_events()),
        vec!["Request timeout. Please try again.".to_string()]
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Grab a free port, then stop listening on it
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port");
    let config = Config {
        api_base_url: Some(format!("http://{}/api", addr)),
        ..Default::default()
    };
    let mut services =
        Services::with_persistence(&config, Arc::new(MemorySessionPersistence::default()))
            .expect("services build");

    let result = services.api.fetch_stats().await;

    assert!(matches!(result, Err(ApiError::NetworkError(_))));
    let mut events = Vec::new();
    while let Ok(event) = services.events.try_recv() {
        events.push(event);
    }
    assert_eq!(
        notice_messages(&events),
        vec!["Network error. Check your connection.".to_string()]
    );
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_authorization() {
    let h = TestHarness::new().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&h.server)
        .await;

    let health = h.services.api.health_check().await.expect("healthy");
    assert_eq!(health["status"], "ok");

    let requests = h.server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_health_check_failure_is_none() {
    let h = TestHarness::new().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    assert!(h.services.api.health_check().await.is_none());
}

#[tokio::test]
async fn test_feedback_body_matches_track() {
    let h = TestHarness::signed_in("abc").await;

    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .and(header("Authorization", "Bearer abc"))
        .and(body_json(serde_json::json!({
            "trackName": "Teardrop",
            "artist": "Massive Attack",
            "liked": false,
            "album": "Mezzanine",
            "year": "1998",
            "spotifyId": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&h.server)
        .await;

    let track = Track {
        track_name: "Teardrop".to_string(),
        artist: "Massive Attack".to_string(),
        album: Some("Mezzanine".to_string()),
        year: Some("1998".to_string()),
        ..Default::default()
    };
    h.services
        .api
        .submit_feedback(&FeedbackRequest::for_track(&track, false))
        .await
        .expect("feedback accepted");

    h.server.verify().await;
}

#[tokio::test]
async fn test_recommendation_batch_decodes() {
    let h = TestHarness::signed_in("abc").await;

    Mock::given(method("POST"))
        .and(path("/api/recommend/next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "recommendations": [
                {"trackName": "Roads", "artist": "Portishead", "source": "lastfm_similar", "likeProb": 0.82},
                {"trackName": "Glory Box", "artist": "Portishead"}
            ],
            "mode": "ML",
            "totalAvailable": 40
        })))
        .mount(&h.server)
        .await;

    let batch = h.services.api.fetch_next_batch().await.expect("batch");

    assert!(batch.is_ml());
    assert_eq!(batch.recommendations.len(), 2);
    assert_eq!(batch.total_available, Some(40));
    assert_eq!(
        batch.recommendations[0].source_display().as_deref(),
        Some("lastfm similar")
    );
}

#[tokio::test]
async fn test_logout_removes_session_file_before_next_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let server = MockServer::start().await;
    let config = Config {
        api_base_url: Some(format!("{}/api", server.uri())),
        client_id: Some("test-client".to_string()),
        ..Default::default()
    };

    let persistence = Arc::new(FileSessionPersistence::new(dir.path()));
    std::fs::write(persistence.path(), signed_in_record("abc")).expect("seed session");

    let first = Services::with_persistence(&config, persistence.clone()).expect("first run");
    assert!(first.session.is_authenticated());
    first.session.logout().await;
    assert!(!persistence.path().exists());

    let second = Services::with_persistence(&config, persistence).expect("second run");
    assert!(!second.session.is_authenticated());
}

#[tokio::test]
async fn test_corrupted_session_file_starts_anonymous() {
    let dir = tempfile::tempdir().expect("temp dir");
    let persistence = Arc::new(FileSessionPersistence::new(dir.path()));
    std::fs::write(persistence.path(), "{not json").expect("seed garbage");

    let services = Services::with_persistence(&Config::default(), persistence.clone())
        .expect("services build");

    assert!(!services.session.is_authenticated());
    assert!(!persistence.path().exists());
}
