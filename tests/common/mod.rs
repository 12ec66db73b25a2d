// tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use flickr_dl::{
    RunContext,
    config::AppConfig,
    error::{AppError, AppResult},
    models::*,
    remote::PhotoService,
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// 内存中的相册服务，用于在不访问 Flickr 的情况下驱动下载流程
#[derive(Default)]
pub struct FakeService {
    albums: Vec<(RemoteAlbum, Vec<MediaItem>)>,
    sizes: HashMap<String, Vec<AssetCandidate>>,
    pub size_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_album(mut self, id: &str, title: &str, items: &[(&str, &str, MediaKind)]) -> Self {
        let items: Vec<MediaItem> = items
            .iter()
            .map(|(id, title, kind)| MediaItem::new(*id, *title, *kind))
            .collect();
        let videos = items.iter().filter(|i| i.kind.is_video()).count() as u64;
        let album = RemoteAlbum {
            id: id.to_string(),
            title: title.to_string(),
            photo_count: items.len() as u64 - videos,
            video_count: videos,
        };
        self.albums.push((album, items));
        self
    }

    /// 为项目登记一个原图尺寸
    pub fn with_original(mut self, item_id: &str, url: &str) -> Self {
        self.sizes.entry(item_id.to_string()).or_default().push(AssetCandidate {
            url: url.to_string(),
            label: "Original".to_string(),
            width: 4000,
            height: 3000,
            size: 0,
        });
        self
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }

    fn find_item(&self, item_id: &str) -> Option<&MediaItem> {
        self.albums
            .iter()
            .flat_map(|(_, items)| items.iter())
            .find(|item| item.id == item_id)
    }
}

#[async_trait]
impl PhotoService for FakeService {
    async fn login(&self) -> AppResult<String> {
        Ok("tester@N00".to_string())
    }

    async fn list_albums(&self) -> AppResult<Vec<RemoteAlbum>> {
        Ok(self.albums.iter().map(|(album, _)| album.clone()).collect())
    }

    async fn album_counts(&self, album_id: &str) -> AppResult<AlbumCounts> {
        self.albums
            .iter()
            .find(|(album, _)| album.id == album_id)
            .map(|(album, _)| AlbumCounts {
                photos: album.photo_count,
                videos: album.video_count,
            })
            .ok_or_else(|| not_found(album_id))
    }

    async fn list_album_items(&self, album_id: &str) -> AppResult<Vec<MediaItem>> {
        self.albums
            .iter()
            .find(|(album, _)| album.id == album_id)
            .map(|(_, items)| items.clone())
            .ok_or_else(|| not_found(album_id))
    }

    async fn media_kind(&self, item_id: &str) -> AppResult<MediaKind> {
        self.find_item(item_id)
            .map(|item| item.kind)
            .ok_or_else(|| not_found(item_id))
    }

    async fn asset_candidates(&self, item_id: &str) -> AppResult<Vec<AssetCandidate>> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sizes.get(item_id).cloned().unwrap_or_default())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::Api {
        code: 1,
        message: format!("'{}' not found", id),
    }
}

/// 下载与缓存目录都位于临时目录中的测试配置
pub fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        download_dir: root.join("downloads"),
        cache_dir: root.join("cache"),
        ..AppConfig::default()
    }
}

pub fn build_context(config: AppConfig, service: Arc<FakeService>) -> RunContext {
    RunContext::new(Arc::new(config), service).expect("Failed to build context")
}

/// 列出目录下的文件名（排序后）
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
