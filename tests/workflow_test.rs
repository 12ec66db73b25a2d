// tests/workflow_test.rs

mod common;

use common::{FakeService, build_context, file_names, test_config};
use flickr_dl::{
    config::{AppConfig, RetryMode},
    models::MediaKind,
    state::{ProgressSet, UrlCache},
    workflows,
};
use std::{fs, sync::Arc};

async fn file_mock(server: &mut mockito::ServerGuard, path: &str, hits: usize) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(format!("bytes of {}", path))
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_shared_item_lands_in_regular_album_only() {
    // --- 1. Arrange (准备阶段) ---
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    let mock_x = file_mock(&mut server, "/files/x.jpg", 1).await;
    let mock_t = file_mock(&mut server, "/files/t.jpg", 1).await;
    let mock_a = file_mock(&mut server, "/files/a.jpg", 1).await;

    // 自动上传相册排在前面，共享项目 X 仍应归属 Trip
    let service = Arc::new(
        FakeService::new()
            .with_album("au", "Auto Upload", &[
                ("x", "Shared", MediaKind::Photo),
                ("a", "", MediaKind::Photo),
            ])
            .with_album("trip", "Trip", &[
                ("x", "Shared", MediaKind::Photo),
                ("t", "Tower", MediaKind::Photo),
            ])
            .with_original("x", &format!("{}/files/x.jpg", url))
            .with_original("t", &format!("{}/files/t.jpg", url))
            .with_original("a", &format!("{}/files/a.jpg", url)),
    );

    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        include_auto_upload: true,
        ..test_config(dir.path())
    };
    let context = build_context(config.clone(), service);

    // --- 2. Act (执行阶段) ---
    let summary = workflows::run(&context).await.unwrap();

    // --- 3. Assert (断言阶段) ---
    assert!(!summary.has_failures());
    assert_eq!(summary.totals(), (3, 0, 0));

    let trip = file_names(&config.download_dir.join("Trip"));
    let auto = file_names(&config.download_dir.join("Auto Upload"));
    assert_eq!(trip, vec!["Shared_x.jpg", "Tower_t.jpg"]);
    assert_eq!(auto, vec!["a.jpg"]);

    // 自动上传相册的预期数量不包含 X，因此校验通过，不会触发重试
    let auto_report = summary
        .reports()
        .iter()
        .find(|r| r.album == "Auto Upload")
        .unwrap();
    assert_eq!(auto_report.downloaded, 1);
    assert!(!auto_report.verification_failed);

    let progress = ProgressSet::load(config.progress_file()).unwrap();
    assert_eq!(progress.len(), 3);
    let cache = UrlCache::load(config.url_cache_file()).unwrap();
    assert_eq!(cache.len(), 3);

    mock_x.assert_async().await;
    mock_t.assert_async().await;
    mock_a.assert_async().await;
}

#[tokio::test]
async fn test_auto_upload_album_is_excluded_by_default() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    let mock_a = file_mock(&mut server, "/files/a.jpg", 0).await;
    let mock_t = file_mock(&mut server, "/files/t.jpg", 1).await;

    let service = Arc::new(
        FakeService::new()
            .with_album("au", "Auto Upload", &[("a", "", MediaKind::Photo)])
            .with_album("trip", "Trip", &[("t", "Tower", MediaKind::Photo)])
            .with_original("a", &format!("{}/files/a.jpg", url))
            .with_original("t", &format!("{}/files/t.jpg", url)),
    );

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let context = build_context(config.clone(), service);

    let summary = workflows::run(&context).await.unwrap();
    assert_eq!(summary.reports().len(), 1);
    assert!(!config.download_dir.join("Auto Upload").exists());

    mock_a.assert_async().await;
    mock_t.assert_async().await;
}

#[tokio::test]
async fn test_missing_files_are_restored_by_automatic_retry() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    let mock_h2 = file_mock(&mut server, "/files/h2.jpg", 1).await;
    let mock_h1 = file_mock(&mut server, "/files/h1.jpg", 0).await;

    let service = Arc::new(
        FakeService::new()
            .with_album("home", "Home", &[
                ("h1", "One", MediaKind::Photo),
                ("h2", "Two", MediaKind::Photo),
            ])
            .with_original("h1", &format!("{}/files/h1.jpg", url))
            .with_original("h2", &format!("{}/files/h2.jpg", url)),
    );

    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        retry_mode: RetryMode::Auto,
        ..test_config(dir.path())
    };

    // 进度中记录了两个项目，但本地只剩一个文件
    let album_dir = config.download_dir.join("Home");
    fs::create_dir_all(&album_dir).unwrap();
    fs::write(album_dir.join("One_h1.jpg"), b"kept").unwrap();
    let mut progress = ProgressSet::load(config.progress_file()).unwrap();
    progress.insert("h1");
    progress.insert("h2");
    progress.save().unwrap();

    let context = build_context(config.clone(), service);
    let summary = workflows::run(&context).await.unwrap();

    assert!(!summary.has_failures());
    let home = &summary.reports()[0];
    assert_eq!(home.downloaded, 1);
    assert!(!home.verification_failed);
    assert_eq!(file_names(&album_dir), vec!["One_h1.jpg", "Two_h2.jpg"]);
    assert_eq!(fs::read(album_dir.join("One_h1.jpg")).unwrap(), b"kept");

    let progress = ProgressSet::load(config.progress_file()).unwrap();
    assert!(progress.contains("h1") && progress.contains("h2"));

    mock_h1.assert_async().await;
    mock_h2.assert_async().await;
}

#[tokio::test]
async fn test_verification_failure_without_retry_resets_progress() {
    let service = Arc::new(
        FakeService::new()
            .with_album("home", "Home", &[
                ("h1", "One", MediaKind::Photo),
                ("h2", "Two", MediaKind::Photo),
            ]),
    );

    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        retry_mode: RetryMode::Never,
        ..test_config(dir.path())
    };
    let album_dir = config.download_dir.join("Home");
    fs::create_dir_all(&album_dir).unwrap();
    fs::write(album_dir.join("One_h1.jpg"), b"kept").unwrap();
    let mut progress = ProgressSet::load(config.progress_file()).unwrap();
    progress.insert("h1");
    progress.insert("h2");
    progress.insert("elsewhere");
    progress.save().unwrap();

    let context = build_context(config.clone(), service);
    let summary = workflows::run(&context).await.unwrap();

    assert!(summary.has_failures());
    assert!(summary.reports()[0].verification_failed);

    // 只有该相册的 ID 被移除
    let progress = ProgressSet::load(config.progress_file()).unwrap();
    assert_eq!(progress.len(), 1);
    assert!(progress.contains("elsewhere"));
}

#[tokio::test]
async fn test_unmatched_filter_downloads_nothing() {
    let service = Arc::new(
        FakeService::new().with_album("trip", "Trip", &[("t", "Tower", MediaKind::Photo)]),
    );
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        album_filter: Some("Holiday*".to_string()),
        ..test_config(dir.path())
    };
    let context = build_context(config.clone(), service.clone());

    let summary = workflows::run(&context).await.unwrap();
    assert!(summary.reports().is_empty());
    assert!(!summary.has_failures());
    assert_eq!(service.size_calls(), 0);
    assert!(file_names(&config.download_dir).is_empty());
}
