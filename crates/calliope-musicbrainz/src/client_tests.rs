// SPDX-License-Identifier: GPL-3.0-or-later

use crate::client::{lucene_escape, pick_best};
use crate::{MusicBrainzClient, MusicBrainzError};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header_exists, method, path, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base: &str) -> MusicBrainzClient {
    MusicBrainzClient::builder()
        .base_url(base)
        .rate_limit_interval(Duration::from_millis(1))
        .build()
        .expect("client")
}

#[test]
fn test_lucene_escape_specials() {
    assert_eq!(lucene_escape("AC/DC"), "AC\\/DC");
    assert_eq!(lucene_escape("What?! (Live)"), "What\\?\\! \\(Live\\)");
    assert_eq!(lucene_escape(r#"a\b"c"#), r#"a\\b\"c"#);
    assert_eq!(lucene_escape("plain words"), "plain words");
}

#[test]
fn test_pick_best_prefers_first_high_score() {
    let matches = vec![
        ("low".to_string(), 40),
        ("high".to_string(), 90),
        ("mid".to_string(), 70),
    ];
    assert_eq!(pick_best(&matches), Some("high".to_string()));
}

#[test]
fn test_pick_best_falls_back_to_top_above_fifty() {
    let matches = vec![("a".to_string(), 40), ("b".to_string(), 60)];
    assert_eq!(pick_best(&matches), Some("b".to_string()));
}

#[test]
fn test_pick_best_rejects_weak_matches() {
    let matches = vec![("a".to_string(), 50), ("b".to_string(), 30)];
    assert_eq!(pick_best(&matches), None);
    assert_eq!(pick_best(&[]), None);
}

#[tokio::test]
async fn test_find_release_id_selects_by_score() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release"))
        .and(query_param("fmt", "json"))
        .and(query_param("limit", "5"))
        .and(header_exists("User-Agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "releases": [
                { "id": "weak-id", "title": "Wrong", "score": 40 },
                { "id": "strong-id", "title": "Right", "score": 90 },
                { "id": "mid-id", "title": "Close", "score": 70 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancellationToken::new();
    let id = client
        .find_release_id("Radiohead", "OK Computer", &cancel)
        .await
        .expect("lookup");
    assert_eq!(id.as_deref(), Some("strong-id"));
}

#[tokio::test]
async fn test_find_release_id_escapes_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release"))
        .and(query_param_contains("query", "AC\\/DC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "releases": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancellationToken::new();
    let id = client
        .find_release_id("AC/DC", "Back in Black", &cancel)
        .await
        .expect("lookup");
    assert_eq!(id, None);
}

#[tokio::test]
async fn test_find_artist_id_no_match_below_threshold() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": [
                { "id": "a", "name": "Someone", "score": 45 },
                { "id": "b", "name": "Else", "score": 20 }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancellationToken::new();
    let id = client.find_artist_id("Nobody", &cancel).await.expect("lookup");
    assert_eq!(id, None);
}

#[tokio::test]
async fn test_rate_limited_status_maps_to_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artist"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancellationToken::new();
    let result = client.find_artist_id("Anyone", &cancel).await;
    assert!(matches!(result, Err(MusicBrainzError::RateLimited)));
}

#[tokio::test]
async fn test_unexpected_status_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancellationToken::new();
    let result = client.find_release_id("a", "b", &cancel).await;
    match result {
        Err(MusicBrainzError::ApiError { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("bad query"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pre_cancelled_token_short_circuits() {
    let server = MockServer::start().await;
    let client = test_client(&server.uri());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = client.find_release_id("a", "b", &cancel).await;
    assert!(matches!(result, Err(MusicBrainzError::Cancelled)));
}
