// src/remote/mod.rs

pub mod flickr;
pub mod rate_limit;

use crate::{error::*, models::*};
use async_trait::async_trait;

/// 远程相册服务提供的能力。所有实现都应通过 `RateLimitedCaller` 发起调用。
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// 校验凭据并返回当前用户 ID
    async fn login(&self) -> AppResult<String>;

    /// 按远程顺序列出所有相册
    async fn list_albums(&self) -> AppResult<Vec<RemoteAlbum>>;

    async fn album_counts(&self, album_id: &str) -> AppResult<AlbumCounts>;

    /// 相册内的全部媒体项目，保持分页顺序
    async fn list_album_items(&self, album_id: &str) -> AppResult<Vec<MediaItem>>;

    async fn media_kind(&self, item_id: &str) -> AppResult<MediaKind>;

    async fn asset_candidates(&self, item_id: &str) -> AppResult<Vec<AssetCandidate>>;
}
