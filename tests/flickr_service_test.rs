// tests/flickr_service_test.rs

use flickr_dl::{
    config::{AppConfig, Credentials},
    error::AppError,
    models::MediaKind,
    remote::{PhotoService, flickr::FlickrService, rate_limit::RateLimitedCaller},
};
use mockito::Matcher;
use std::{fs, sync::Arc, time::Duration};

const REST_PATH: &str = "/services/rest/";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name))
        .expect("fixture should exist")
}

fn method(name: &str) -> Matcher {
    Matcher::UrlEncoded("method".into(), name.into())
}

fn service_for(server: &mockito::ServerGuard, config: AppConfig) -> FlickrService {
    let config = AppConfig {
        api_endpoint: format!("{}{}", server.url(), REST_PATH),
        ..config
    };
    let caller = Arc::new(RateLimitedCaller::new(
        config.retry_policy.clone(),
        Duration::ZERO,
    ));
    FlickrService::new(&config, caller).expect("Failed to build service")
}

#[tokio::test]
async fn test_login_and_paginated_album_listing() {
    // --- 1. Arrange (准备阶段) ---
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.test.login"),
            Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
            Matcher::UrlEncoded("nojsoncallback".into(), "1".into()),
        ]))
        .with_body(fixture("login.json"))
        .expect(1)
        .create_async()
        .await;
    let page1 = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.photosets.getList"),
            Matcher::UrlEncoded("user_id".into(), "12345678@N00".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_body(fixture("photosets_page1.json"))
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.photosets.getList"),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_body(fixture("photosets_page2.json"))
        .expect(1)
        .create_async()
        .await;

    let service = service_for(&server, AppConfig::default());

    // --- 2. Act (执行阶段) ---
    let user_id = service.login().await.unwrap();
    let albums = service.list_albums().await.unwrap();

    // --- 3. Assert (断言阶段) ---
    assert_eq!(user_id, "12345678@N00");
    let titles: Vec<&str> = albums.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Trip", "Auto Upload", "Clips"]);
    // 数量字段可能是字符串也可能是数字
    assert_eq!((albums[0].photo_count, albums[0].video_count), (12, 1));
    assert_eq!((albums[1].photo_count, albums[1].video_count), (340, 5));
    assert_eq!((albums[2].photo_count, albums[2].video_count), (0, 4));

    login.assert_async().await;
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn test_album_items_and_sizes() {
    let mut server = mockito::Server::new_async().await;
    let _photos = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.photosets.getPhotos"),
            Matcher::UrlEncoded("photoset_id".into(), "72157600000000001".into()),
            Matcher::UrlEncoded("extras".into(), "media".into()),
        ]))
        .with_body(fixture("photoset_photos.json"))
        .create_async()
        .await;
    let _sizes = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.photos.getSizes"),
            Matcher::UrlEncoded("photo_id".into(), "5003".into()),
        ]))
        .with_body(fixture("sizes_video.json"))
        .create_async()
        .await;

    let service = service_for(&server, AppConfig::default());

    let items = service.list_album_items("72157600000000001").await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title, "Beach");
    assert_eq!(items[1].title, "");
    assert_eq!(items[2].kind, MediaKind::Video);

    let candidates = service.asset_candidates("5003").await.unwrap();
    assert_eq!(candidates.len(), 4);
    assert_eq!(candidates[3].label, "Video Original");
    assert_eq!((candidates[3].width, candidates[3].height), (1920, 1080));
}

#[tokio::test]
async fn test_busy_response_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let busy = server
        .mock("GET", REST_PATH)
        .match_query(method("flickr.test.login"))
        .with_body(r#"{"stat": "fail", "code": 105, "message": "Service currently unavailable"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", REST_PATH)
        .match_query(method("flickr.test.login"))
        .with_body(fixture("login.json"))
        .expect(1)
        .create_async()
        .await;

    let service = service_for(&server, AppConfig::default());
    assert_eq!(service.login().await.unwrap(), "12345678@N00");

    busy.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_api_error_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let failure = server
        .mock("GET", REST_PATH)
        .match_query(method("flickr.photosets.getInfo"))
        .with_body(r#"{"stat": "fail", "code": 1, "message": "Photoset not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let service = service_for(&server, AppConfig::default());
    let err = service.album_counts("missing").await.unwrap_err();
    assert!(matches!(err, AppError::Api { code: 1, .. }));

    failure.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("GET", REST_PATH)
        .match_query(method("flickr.photos.getInfo"))
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let service = service_for(&server, AppConfig::default());
    let err = service.media_kind("5001").await.unwrap_err();
    assert!(matches!(err, AppError::RetriesExhausted { attempts: 3, .. }));

    unavailable.assert_async().await;
}

#[tokio::test]
async fn test_auth_token_requests_are_signed() {
    let mut server = mockito::Server::new_async().await;
    let signed = server
        .mock("GET", REST_PATH)
        .match_query(Matcher::AllOf(vec![
            method("flickr.test.login"),
            Matcher::UrlEncoded("auth_token".into(), "token-123".into()),
            Matcher::Regex("api_sig=[0-9a-f]{32}".into()),
        ]))
        .with_body(fixture("login.json"))
        .expect(1)
        .create_async()
        .await;

    let config = AppConfig {
        credentials: Credentials {
            api_key: "test-key".into(),
            api_secret: "test-secret".into(),
            auth_token: Some("token-123".into()),
        },
        ..AppConfig::default()
    };
    let service = service_for(&server, config);
    service.login().await.unwrap();

    signed.assert_async().await;
}
