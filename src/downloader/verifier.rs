// src/downloader/verifier.rs

use super::resolver::OwnershipMap;
use crate::{RunContext, error::*, models::*, state::ProgressSet, ui, utils};
use log::{error, info, warn};
use std::{collections::BTreeSet, fs, path::Path};

/// 该相册预期在本地出现的项目 ID：按配置去掉视频，再去掉归属其他相册的项目
pub fn expected_ids<'a>(
    album_id: &str,
    listing: &'a [MediaItem],
    ownership: &OwnershipMap,
    download_video: bool,
) -> BTreeSet<&'a str> {
    listing
        .iter()
        .filter(|item| download_video || !item.kind.is_video())
        .filter(|item| ownership.is_owned_by(album_id, &item.id))
        .map(|item| item.id.as_str())
        .collect()
}

/// 统计目录下的非空普通文件。隐藏文件（包括残留的临时文件）不计入，
/// 不下载视频时也忽略视频文件。
pub fn count_local_files(dir: &Path, download_video: bool) -> AppResult<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() || metadata.len() == 0 {
            continue;
        }
        if !download_video && utils::is_video_extension(&path) {
            continue;
        }
        count += 1;
    }
    Ok(count)
}

/// 比较预期与实际数量。缺失时从进度中移除该相册列表中的所有 ID。
pub fn evaluate(
    expected: usize,
    actual: usize,
    listing: &[MediaItem],
    progress: &mut ProgressSet,
) -> Verification {
    let outcome = if expected > actual {
        let reset = progress.remove_all(listing.iter().map(|item| item.id.as_str()));
        VerificationOutcome::Missing { reset }
    } else if expected < actual {
        VerificationOutcome::Extra(actual - expected)
    } else {
        VerificationOutcome::Passed
    };
    Verification {
        expected,
        actual,
        outcome,
    }
}

/// 校验单个相册在本地的完整性
pub struct CompletionVerifier<'a> {
    context: &'a RunContext,
}

impl<'a> CompletionVerifier<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    /// 校验过程中的任何错误都视为通过，不重置进度。
    pub async fn verify(
        &self,
        album_id: &str,
        album_dir: &Path,
        album_name: &str,
        ownership: &OwnershipMap,
        progress: &mut ProgressSet,
    ) -> Verification {
        match self
            .try_verify(album_id, album_dir, album_name, ownership, progress)
            .await
        {
            Ok(verification) => verification,
            Err(e) => {
                error!("校验相册 '{}' 时出错: {}", album_name, e);
                ui::error(&format!("校验相册 '{}' 时出错: {}", album_name, e));
                Verification {
                    expected: 0,
                    actual: 0,
                    outcome: VerificationOutcome::Passed,
                }
            }
        }
    }

    async fn try_verify(
        &self,
        album_id: &str,
        album_dir: &Path,
        album_name: &str,
        ownership: &OwnershipMap,
        progress: &mut ProgressSet,
    ) -> AppResult<Verification> {
        let download_video = self.context.config.download_video;
        let counts = self.context.service.album_counts(album_id).await?;
        let listing = self.context.service.list_album_items(album_id).await?;

        let expected = expected_ids(album_id, &listing, ownership, download_video).len();
        let actual = count_local_files(album_dir, download_video)?;
        info!(
            "校验相册 '{}': 远程 {} 张照片 / {} 个视频, 预期本地 {} 个文件, 实际 {} 个",
            album_name, counts.photos, counts.videos, expected, actual
        );

        let verification = evaluate(expected, actual, &listing, progress);
        match verification.outcome {
            VerificationOutcome::Passed => {
                ui::info(&format!("相册 '{}' 校验通过 ({} 个文件)。", album_name, actual));
            }
            VerificationOutcome::Extra(extra) => {
                info!("相册 '{}' 本地多出 {} 个文件", album_name, extra);
                ui::info(&format!(
                    "相册 '{}' 校验通过，本地比预期多 {} 个文件 (预期 {}, 实际 {})。",
                    album_name, extra, expected, actual
                ));
            }
            VerificationOutcome::Missing { reset } => {
                warn!(
                    "相册 '{}' 缺少文件 (预期 {}, 实际 {})，已重置 {} 个项目的进度",
                    album_name, expected, actual, reset
                );
                ui::warn(&format!(
                    "相册 '{}' 缺少 {} 个文件 (预期 {}, 实际 {})。",
                    album_name,
                    expected - actual,
                    expected,
                    actual
                ));
                if let Err(e) = progress.save() {
                    warn!("保存下载进度失败: {}", e);
                }
            }
        }
        Ok(verification)
    }
}
