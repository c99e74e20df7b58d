//! End-to-end tests with a mocked episode source.
//!
//! These tests run the full server stack in-process over an on-disk SQLite
//! database, with a mock standing in for the episode fetcher.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use tsuiseki_core::SourceError;

use common::{fixtures, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["refresh"]["max_pages"], 3);
    assert_eq!(response.body["debug"], false);
}

#[tokio::test]
async fn test_scheduler_status_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/scheduler/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["running"], false);
    assert_eq!(response.body["interval_secs"], 3600);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("tsuiseki_subscriptions_by_status"));
    assert!(body.contains("tsuiseki_http_requests_total"));
}

// =============================================================================
// Subscription lifecycle
// =============================================================================

#[tokio::test]
async fn test_follow_list_and_delete() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/subscriptions",
            json!({ "name": "another", "episode": 2 }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    assert_eq!(response.body["data"]["series_name"], "Another Story");
    assert_eq!(response.body["data"]["watermark"], 2);

    let list = fixture.get("/api/v1/subscriptions").await;
    assert_status!(list, StatusCode::OK);
    assert_eq!(list.body["data"].as_array().unwrap().len(), 1);

    let deleted = fixture
        .delete("/api/v1/subscriptions/Another%20Story")
        .await;
    assert_status!(deleted, StatusCode::OK);

    let list = fixture.get("/api/v1/subscriptions").await;
    assert!(list.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_follow_twice_is_warning() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;

    let response = fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "warning");
    assert_eq!(response.body["error_kind"], "already_exists");
}

#[tokio::test]
async fn test_follow_unknown_series_is_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/subscriptions", json!({ "name": "No Such Show" }))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], "error");
}

#[tokio::test]
async fn test_clear_all_requires_confirmation() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show B" }))
        .await;

    let refused = fixture.delete("/api/v1/subscriptions").await;
    assert_status!(refused, StatusCode::BAD_REQUEST);

    let cleared = fixture.delete("/api/v1/subscriptions?confirm=true").await;
    assert_status!(cleared, StatusCode::OK);
    assert_eq!(cleared.body["data"]["deleted"], 2);

    let deleted = fixture.get("/api/v1/subscriptions?status=deleted").await;
    assert_eq!(deleted.body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_and_status_change() {
    let fixture = TestFixture::new().await;
    fixture
        .post(
            "/api/v1/subscriptions",
            json!({ "name": "Show A", "episode": 1 }),
        )
        .await;

    let marked = fixture
        .post("/api/v1/subscriptions/Show%20A/mark", json!({ "episode": 8 }))
        .await;
    assert_status!(marked, StatusCode::OK);
    assert_eq!(marked.body["data"]["watermark"], 8);

    let negative = fixture
        .post("/api/v1/subscriptions/Show%20A/mark", json!({ "episode": -1 }))
        .await;
    assert!(negative.status.is_client_error());

    let updated = fixture
        .put("/api/v1/subscriptions/Show%20A/status", json!({ "status": 2 }))
        .await;
    assert_status!(updated, StatusCode::OK);
    assert_eq!(updated.body["data"]["status"], "updated");

    let invalid = fixture
        .put("/api/v1/subscriptions/Show%20A/status", json!({ "status": 99 }))
        .await;
    assert_status!(invalid, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["message"], "Invalid status: 99");

    let list = fixture.get("/api/v1/subscriptions?status=updated").await;
    assert_eq!(list.body["data"][0]["watermark"], 8);
}

#[tokio::test]
async fn test_filter_edit() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;

    let response = fixture
        .put(
            "/api/v1/subscriptions/Show%20A/filter",
            json!({ "subtitle": "G2,missing", "exclude": "720p" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["followed"][0]["id"], "g2");
    assert_eq!(response.body["data"]["exclude"][0], "720p");

    let bad = fixture
        .put(
            "/api/v1/subscriptions/Show%20A/filter",
            json!({ "regex": "(unclosed" }),
        )
        .await;
    assert_status!(bad, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Refresh and downloads
// =============================================================================

#[tokio::test]
async fn test_refresh_queues_downloads() {
    let fixture = TestFixture::new().await;
    fixture
        .post(
            "/api/v1/subscriptions",
            json!({ "name": "Show A", "episode": 3 }),
        )
        .await;
    fixture
        .source
        .set_episodes(
            "Show A",
            vec![
                fixtures::episode("Show A", 4, "g1"),
                fixtures::episode("Show A", 4, "g2"),
                fixtures::episode("Show A", 6, "g1"),
            ],
        )
        .await;

    let response = fixture.post("/api/v1/refresh", json!({})).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "success");
    let series = &response.body["data"]["series"][0];
    assert_eq!(series["series_name"], "Show A");
    assert_eq!(series["result"], "updated");
    assert_eq!(series["watermark"], 6);
    assert_eq!(series["queued"], json!([4, 6]));

    let downloads = fixture.get("/api/v1/downloads?status=queued").await;
    assert_status!(downloads, StatusCode::OK);
    assert_eq!(downloads.body["total"], 2);

    let id = downloads.body["tasks"][0]["id"].as_str().unwrap().to_string();
    let done = fixture
        .put(
            &format!("/api/v1/downloads/{}/status", id),
            json!({ "status": "done" }),
        )
        .await;
    assert_status!(done, StatusCode::OK);
    assert_eq!(done.body["status"], "done");

    let reopened = fixture
        .put(
            &format!("/api/v1/downloads/{}/status", id),
            json!({ "status": "in_progress" }),
        )
        .await;
    assert_status!(reopened, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_failure_is_reported_per_series() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show A" }))
        .await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show B" }))
        .await;
    fixture.source.fail_series("Show A", "refused").await;
    fixture
        .source
        .set_episodes("Show B", fixtures::episodes("Show B", 1..=1, "g1"))
        .await;

    let response = fixture.post("/api/v1/refresh", json!({})).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "warning");

    let series = response.body["data"]["series"].as_array().unwrap();
    let failed = series.iter().find(|s| s["series_name"] == "Show A").unwrap();
    assert_eq!(failed["result"], "failed");
    let updated = series.iter().find(|s| s["series_name"] == "Show B").unwrap();
    assert_eq!(updated["result"], "updated");
}

#[tokio::test]
async fn test_unknown_download_is_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .put(
            "/api/v1/downloads/550e8400-e29b-41d4-a716-446655440000/status",
            json!({ "status": "failed" }),
        )
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

// =============================================================================
// Search, calendar and catalog
// =============================================================================

#[tokio::test]
async fn test_search() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .set_search_results(vec![
            fixtures::episode("Show A", 3, "g1"),
            fixtures::episode("Show A", 1, "g1"),
            fixtures::episode("Show A", 1, "g2"),
        ])
        .await;

    let response = fixture
        .post("/api/v1/search", json!({ "keyword": "Show", "count": 1 }))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["data"]["options"]["count"], 1);
    let episodes = response.body["data"]["episodes"].as_array().unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0]["episode"], 1);
    assert_eq!(episodes[1]["episode"], 3);
}

#[tokio::test]
async fn test_search_transport_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .source
        .set_next_error(SourceError::ConnectionFailed("down".to_string()))
        .await;

    let response = fixture
        .post("/api/v1/search", json!({ "keyword": "Show" }))
        .await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["status"], "error");
    assert_eq!(response.body["data"]["options"]["keyword"], "Show");
}

#[tokio::test]
async fn test_debug_mode_returns_raw_errors() {
    let fixture = TestFixture::with_debug(true).await;
    fixture.source.set_next_error(SourceError::Timeout).await;

    let response = fixture
        .post("/api/v1/search", json!({ "keyword": "Show" }))
        .await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["kind"], "transport");
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_calendar() {
    let fixture = TestFixture::new().await;
    fixture
        .post("/api/v1/subscriptions", json!({ "name": "Show B" }))
        .await;

    let response = fixture.get("/api/v1/calendar").await;
    assert_status!(response, StatusCode::OK);
    let saturday = response.body["data"]["sat"].as_array().unwrap();
    assert_eq!(saturday.len(), 3);
    let show_b = saturday.iter().find(|e| e["name"] == "Show B").unwrap();
    assert_eq!(show_b["status"], "followed");
    assert!(response.body["data"]["mon"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_ingest() {
    let fixture = TestFixture::new().await;

    let series = fixture
        .post(
            "/api/v1/catalog/series",
            json!([{
                "name": "New Show",
                "subtitle_groups": [{ "id": "g9", "name": "Group Nine" }],
                "update_day": "Tue"
            }]),
        )
        .await;
    assert_status!(series, StatusCode::OK);
    assert_eq!(series.body["added"], 1);

    let episodes = fixture
        .post(
            "/api/v1/catalog/episodes",
            json!([
                {
                    "series_name": "New Show",
                    "episode": 5,
                    "title": "[g9] New Show - 05",
                    "subtitle_group": "g9",
                    "download": "magnet:?xt=urn:btih:new-show-5"
                },
                {
                    "series_name": "Unknown Show",
                    "episode": 1,
                    "title": "Unknown Show - 01",
                    "download": "magnet:?xt=urn:btih:unknown-1"
                }
            ]),
        )
        .await;
    assert_status!(episodes, StatusCode::OK);
    assert_eq!(episodes.body["received"], 2);
    assert_eq!(episodes.body["added"], 1);

    let stats = fixture.get("/api/v1/catalog/stats").await;
    assert_eq!(stats.body["total_series"], 4);
    assert_eq!(stats.body["total_episodes"], 1);

    // Following picks up the highest ingested episode
    let followed = fixture
        .post("/api/v1/subscriptions", json!({ "name": "new show" }))
        .await;
    assert_eq!(followed.body["data"]["watermark"], 5);

    let list = fixture.get("/api/v1/catalog/series").await;
    assert_eq!(list.body["total"], 4);
}

// =============================================================================
// Scripted series
// =============================================================================

#[tokio::test]
async fn test_scripted_series_over_http() {
    let fixture = TestFixture::new().await;

    let registered = fixture
        .post(
            "/api/v1/scripts",
            json!({
                "name": "Scripted Show",
                "update_day": "Mon",
                "episode": 1,
                "releases": { "1": "magnet:?xt=urn:btih:s1", "2": "magnet:?xt=urn:btih:s2" }
            }),
        )
        .await;
    assert_status!(registered, StatusCode::OK);
    assert_eq!(registered.body["status"], "success");

    let calendar = fixture.get("/api/v1/calendar").await;
    assert_eq!(calendar.body["data"]["mon"][0]["name"], "Scripted Show");
    assert_eq!(calendar.body["data"]["mon"][0]["scripted"], true);

    let refreshed = fixture.post("/api/v1/refresh", json!({})).await;
    assert_status!(refreshed, StatusCode::OK);
    let script = &refreshed.body["data"]["scripts"][0];
    assert_eq!(script["result"], "updated");
    assert_eq!(script["queued"], json!([2]));

    let downloads = fixture.get("/api/v1/downloads?status=queued").await;
    assert_eq!(downloads.body["total"], 1);
    assert_eq!(downloads.body["tasks"][0]["series_name"], "Scripted Show");

    let marked = fixture
        .post(
            "/api/v1/subscriptions/Scripted%20Show/mark",
            json!({ "episode": 0 }),
        )
        .await;
    assert_status!(marked, StatusCode::OK);

    let listed = fixture.get("/api/v1/scripts").await;
    assert_status!(listed, StatusCode::OK);
    assert_eq!(listed.body["data"][0]["episode"], 0);
}

#[tokio::test]
async fn test_script_with_blank_link_is_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post(
            "/api/v1/scripts",
            json!({ "name": "Scripted Show", "update_day": "Mon", "releases": { "1": "" } }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}
