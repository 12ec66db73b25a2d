// src/downloader/negotiator.rs

use crate::{
    RunContext,
    error::AppResult,
    models::{AssetCandidate, MediaItem, MediaKind, ResolvedAsset},
    state::UrlCache,
    utils,
};
use itertools::Itertools;
use log::{debug, info, warn};
use std::cmp::Ordering;

/// 按 (是否原图, 分辨率, 文件大小) 降序比较，相等时保持原有顺序
fn quality_order(a: &AssetCandidate, b: &AssetCandidate) -> Ordering {
    (b.is_original(), b.resolution(), b.size).cmp(&(a.is_original(), a.resolution(), a.size))
}

/// 从同一媒体项目的所有尺寸中选出最佳的一个。过滤后为空时返回 `None`。
pub fn select_best_asset(candidates: &[AssetCandidate], kind: MediaKind) -> Option<ResolvedAsset> {
    candidates
        .iter()
        .filter(|c| c.looks_like_video() == kind.is_video())
        .sorted_by(|a, b| quality_order(a, b))
        .next()
        .map(|best| ResolvedAsset {
            url: best.url.clone(),
            media_type: kind,
            selected_info: format!(
                "{} ({}x{}){}",
                best.label,
                best.width,
                best.height,
                utils::size_suffix(best.size)
            ),
        })
}

/// 负责把媒体项目解析为下载地址，优先使用 URL 缓存
pub struct ItemNegotiator<'a> {
    context: &'a RunContext,
}

impl<'a> ItemNegotiator<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    /// 返回 `Ok(None)` 表示没有可下载的版本（包括视频被配置关闭）。
    pub async fn resolve(
        &self,
        item: &MediaItem,
        cache: &mut UrlCache,
    ) -> AppResult<Option<ResolvedAsset>> {
        let download_video = self.context.config.download_video;

        if !self.context.config.refresh_url_cache
            && let Some(cached) = cache.get(&item.id)
        {
            debug!("项目 {} 命中 URL 缓存: {}", item.id, cached.selected_info);
            if cached.media_type.is_video() && !download_video {
                return Ok(None);
            }
            return Ok(Some(cached.clone()));
        }

        let kind = self.context.service.media_kind(&item.id).await?;
        if kind.is_video() && !download_video {
            debug!("项目 {} 是视频，已按配置跳过", item.id);
            return Ok(None);
        }

        let candidates = self.context.service.asset_candidates(&item.id).await?;
        let Some(asset) = select_best_asset(&candidates, kind) else {
            warn!(
                "项目 {} ({}) 在 {} 个尺寸中没有可用的 {} 版本",
                item.id,
                item.title,
                candidates.len(),
                kind
            );
            return Ok(None);
        };

        info!("项目 {} 选择版本: {}", item.id, asset.selected_info);
        cache.insert(&item.id, asset.clone());
        if let Err(e) = cache.save() {
            warn!("保存 URL 缓存失败: {}", e);
        }
        Ok(Some(asset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(label: &str, width: u64, height: u64, size: u64, url: &str) -> AssetCandidate {
        AssetCandidate {
            url: url.to_string(),
            label: label.to_string(),
            width,
            height,
            size,
        }
    }

    #[test]
    fn test_original_beats_larger_resolution() {
        let candidates = vec![
            candidate("Medium", 10, 10, 10, "https://x/m.jpg"),
            candidate("Original", 5, 10, 5, "https://x/o.jpg"),
        ];
        let best = select_best_asset(&candidates, MediaKind::Photo).unwrap();
        assert_eq!(best.url, "https://x/o.jpg");
        assert!(best.selected_info.starts_with("Original (5x10)"));
    }

    #[test]
    fn test_size_breaks_resolution_tie() {
        let candidates = vec![
            candidate("Large", 10, 10, 100, "https://x/a.jpg"),
            candidate("Large 2", 10, 10, 200, "https://x/b.jpg"),
        ];
        let best = select_best_asset(&candidates, MediaKind::Photo).unwrap();
        assert_eq!(best.url, "https://x/b.jpg");
    }

    #[test]
    fn test_full_tie_keeps_remote_order() {
        let candidates = vec![
            candidate("Large", 10, 10, 0, "https://x/first.jpg"),
            candidate("Large", 10, 10, 0, "https://x/second.jpg"),
        ];
        let best = select_best_asset(&candidates, MediaKind::Photo).unwrap();
        assert_eq!(best.url, "https://x/first.jpg");
        assert_eq!(best.selected_info, "Large (10x10)");
    }

    #[test]
    fn test_kind_filters_candidates() {
        let candidates = vec![
            candidate("Original", 4000, 3000, 0, "https://x/o.jpg"),
            candidate("Video Original", 1920, 1080, 0, "https://x/play/orig/1/"),
            candidate("Site MP4", 640, 360, 0, "https://x/play/site/1/"),
        ];
        let video = select_best_asset(&candidates, MediaKind::Video).unwrap();
        assert_eq!(video.url, "https://x/play/orig/1/");
        assert_eq!(video.media_type, MediaKind::Video);

        let photo = select_best_asset(&candidates, MediaKind::Photo).unwrap();
        assert_eq!(photo.url, "https://x/o.jpg");
    }

    #[test]
    fn test_no_candidates_after_filtering() {
        assert!(select_best_asset(&[], MediaKind::Photo).is_none());
        let only_photos = vec![candidate("Original", 1, 1, 1, "https://x/o.jpg")];
        assert!(select_best_asset(&only_photos, MediaKind::Video).is_none());
    }
}
