use calliope_artwork::{CoverArtClient, ProviderError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

fn client(server: &MockServer) -> CoverArtClient {
    CoverArtClient::new(Some(server.uri())).expect("client")
}

#[tokio::test]
async fn test_fetch_front_returns_bytes_and_header_mime() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/mbid-1/front"))
        .and(header("Accept", "image/*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG_BYTES)
                .insert_header("Content-Type", "image/jpeg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let image = client(&server)
        .fetch_front("mbid-1", &cancel)
        .await
        .expect("fetch");
    assert_eq!(image.bytes, JPEG_BYTES);
    assert_eq!(image.mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_fetch_front_sniffs_mime_when_header_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/mbid-2/front"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(PNG_BYTES)
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let image = client(&server)
        .fetch_front("mbid-2", &cancel)
        .await
        .expect("fetch");
    assert_eq!(image.mime_type, "image/png");
}

#[tokio::test]
async fn test_fetch_front_404_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/missing/front"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).fetch_front("missing", &cancel).await;
    assert!(matches!(result, Err(ProviderError::NotFound)));
}

#[tokio::test]
async fn test_fetch_front_429_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/busy/front"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).fetch_front("busy", &cancel).await;
    match result {
        Err(error) => assert!(error.is_transient(), "429 must be retryable: {:?}", error),
        Ok(_) => panic!("expected error"),
    }
}

#[tokio::test]
async fn test_fetch_front_503_is_temporary() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/flaky/front"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).fetch_front("flaky", &cancel).await;
    assert!(matches!(result, Err(ProviderError::Temporary(_))));
}

#[tokio::test]
async fn test_fetch_front_unexpected_status_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release/odd/front"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad id"))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let result = client(&server).fetch_front("odd", &cancel).await;
    match result {
        Err(ProviderError::Upstream { status, .. }) => assert_eq!(status, 400),
        other => panic!("expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_front_pre_cancelled() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = client(&server).fetch_front("any", &cancel).await;
    assert!(matches!(result, Err(ProviderError::Cancelled)));
}
