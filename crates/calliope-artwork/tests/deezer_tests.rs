use calliope_artwork::{DeezerClient, ProviderError};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DeezerClient {
    DeezerClient::new(Some(server.uri())).expect("client")
}

#[tokio::test]
async fn test_search_artist_image_picks_highest_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .and(query_param("q", "Portishead"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "name": "Portishead",
                    "picture_small": "http://img/small.jpg",
                    "picture_medium": "http://img/medium.jpg",
                    "picture_big": "http://img/big.jpg",
                    "picture_xl": "http://img/xl.jpg"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let image = client(&server)
        .search_artist_image("Portishead", &cancel)
        .await
        .expect("search");
    assert_eq!(image.url, "http://img/xl.jpg");
    assert_eq!(image.artist_name, "Portishead");
}

#[tokio::test]
async fn test_search_artist_image_case_insensitive_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "name": "MASSIVE ATTACK", "picture_big": "http://img/ma.jpg" }
            ]
        })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let image = client(&server)
        .search_artist_image("massive attack", &cancel)
        .await
        .expect("search");
    assert_eq!(image.url, "http://img/ma.jpg");
}

#[tokio::test]
async fn test_search_artist_image_unrelated_results_are_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "name": "Somebody Else", "picture_xl": "http://img/else.jpg" }
            ]
        })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).search_artist_image("Burial", &cancel).await;
    assert!(matches!(result, Err(ProviderError::NotFound)));
}

#[tokio::test]
async fn test_search_artist_image_empty_data_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).search_artist_image("Nobody", &cancel).await;
    assert!(matches!(result, Err(ProviderError::NotFound)));
}

#[tokio::test]
async fn test_search_artist_image_caches_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "name": "Caribou", "picture_xl": "http://img/caribou.jpg" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();
    let first = client.search_artist_image("Caribou", &cancel).await.expect("first");
    let second = client.search_artist_image("caribou", &cancel).await.expect("second");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_search_artist_image_5xx_is_temporary() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/artist"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).search_artist_image("Anyone", &cancel).await;
    assert!(matches!(result, Err(ProviderError::Temporary(_))));
}
