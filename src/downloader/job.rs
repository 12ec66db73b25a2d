// src/downloader/job.rs

use super::{negotiator::ItemNegotiator, task_runner};
use crate::{
    RunContext, constants,
    error::*,
    models::*,
    state::{ProgressSet, RunState},
    symbols, ui, utils,
};
use colored::Colorize;
use log::{debug, error, info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 媒体文件名: `<清理后的标题>_<id>.<ext>`，标题为空时只用 ID
pub fn build_file_name(item: &MediaItem, ext: &str) -> String {
    if item.title.trim().is_empty() {
        format!("{}.{}", item.id, ext)
    } else {
        format!("{}_{}.{}", utils::sanitize_filename(&item.title), item.id, ext)
    }
}

/// 查找同名主干下已存在的非空媒体文件（扩展名可能在下载后被修正过）
pub fn find_existing_file(target: &Path) -> Option<PathBuf> {
    let is_non_empty = |p: &Path| fs::metadata(p).is_ok_and(|m| m.is_file() && m.len() > 0);
    if is_non_empty(target) {
        return Some(target.to_path_buf());
    }
    constants::extensions::IMAGE
        .iter()
        .chain(constants::extensions::VIDEO)
        .map(|ext| target.with_extension(ext))
        .find(|candidate| candidate != target && is_non_empty(candidate))
}

fn is_dir_empty(dir: &Path) -> AppResult<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// 尝试在目录中创建并删除一个临时文件
fn probe_writable(dir: &Path) -> AppResult<()> {
    tempfile::Builder::new()
        .prefix(constants::TEMP_FILE_PREFIX)
        .tempfile_in(dir)?;
    Ok(())
}

/// 删除上次运行被中断时残留的临时文件，返回删除的数量
pub fn remove_stale_temp_files(dir: &Path) -> AppResult<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_temp = entry
            .file_name()
            .to_string_lossy()
            .starts_with(constants::TEMP_FILE_PREFIX);
        if is_temp && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// 下载一个相册的工作列表
pub struct AlbumDownloader<'a> {
    context: &'a RunContext,
}

impl<'a> AlbumDownloader<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    pub fn album_dir(&self, album_name: &str) -> AppResult<PathBuf> {
        let root = &self.context.config.download_dir;
        fs::create_dir_all(root)?;
        utils::secure_join_path(root, Path::new(album_name))
    }

    /// `work` 是该相册拥有的项目列表。返回本相册的统计，下载进度在结束时保存。
    pub async fn run(
        &self,
        album: &AlbumRecord,
        work: &[MediaItem],
        state: &mut RunState,
    ) -> AppResult<AlbumReport> {
        let mut report = AlbumReport::new(&album.name);
        if work.is_empty() {
            info!("相册 '{}' 没有需要下载的项目", album.name);
            return Ok(report);
        }

        let album_dir = self.album_dir(&album.name)?;
        if album_dir.is_dir() {
            match remove_stale_temp_files(&album_dir) {
                Ok(0) => {}
                Ok(n) => info!("已清理相册 '{}' 中 {} 个残留的临时文件", album.name, n),
                Err(e) => warn!("清理相册 '{}' 的临时文件失败: {}", album.name, e),
            }
        }
        if album_dir.is_dir() && is_dir_empty(&album_dir)? {
            reset_progress_for_empty_dir(album, &mut state.progress);
        }
        fs::create_dir_all(&album_dir)?;

        if let Err(e) = probe_writable(&album_dir) {
            error!("目录 {:?} 不可写: {}", album_dir, e);
            ui::error(&format!("目录 '{}' 不可写: {}", album_dir.display(), e));
            for item in work.iter().filter(|i| !state.progress.contains(&i.id)) {
                report.record_failure(&item.id, "目录不可写");
            }
            return Ok(report);
        }

        let tasks = self.plan_tasks(work, &album_dir, state, &mut report).await;
        debug!(
            "相册 '{}': {} 个待下载, {} 个跳过, {} 个失败",
            album.name,
            tasks.len(),
            report.skipped,
            report.failed
        );

        if tasks.is_empty() {
            println!(
                "{} 相册 '{}' 的 {} 个项目均已下载或无需下载。",
                *symbols::SKIP,
                album.name,
                report.skipped
            );
        } else {
            let label = utils::truncate_text(&album.name, 24);
            let results = task_runner::execute_tasks(self.context, tasks, &label).await;
            for result in results {
                self.apply_result(result, &mut state.progress, &mut report);
            }
        }

        state.progress.save()?;
        Ok(report)
    }

    /// 逐项解析下载地址并生成下载任务。远程调用在这里串行进行。
    async fn plan_tasks(
        &self,
        work: &[MediaItem],
        album_dir: &Path,
        state: &mut RunState,
        report: &mut AlbumReport,
    ) -> Vec<FetchTask> {
        let negotiator = ItemNegotiator::new(self.context);
        let mut tasks = Vec::new();

        for item in work {
            if state.progress.contains(&item.id) {
                report.skipped += 1;
                continue;
            }

            let asset = match negotiator.resolve(item, &mut state.url_cache).await {
                Ok(Some(asset)) => asset,
                Ok(None) => {
                    debug!("项目 {} 没有可下载的版本，跳过", item.id);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("解析项目 {} 的下载地址失败: {}", item.id, e);
                    eprintln!(
                        "{} {} {}",
                        *symbols::ERROR,
                        item.id,
                        format!("无法获取下载地址: {}", e).red()
                    );
                    report.record_failure(&item.id, FailureKind::from(&e).get_display_info().2);
                    continue;
                }
            };

            let ext = utils::extension_from_url(&asset.url, asset.media_type);
            let filepath = album_dir.join(build_file_name(item, &ext));

            if let Some(existing) = find_existing_file(&filepath) {
                debug!("文件已存在，跳过: {:?}", existing);
                state.progress.insert(item.id.clone());
                report.skipped += 1;
                continue;
            }

            tasks.push(FetchTask {
                item_id: item.id.clone(),
                url: asset.url,
                filepath,
                kind: asset.media_type,
            });
        }
        tasks
    }

    /// 在控制流程上处理单个任务结果：只有非空文件才计入进度
    fn apply_result(&self, result: FetchResult, progress: &mut ProgressSet, report: &mut AlbumReport) {
        match result.outcome {
            FetchOutcome::Saved(path) => {
                let valid = fs::metadata(&path).is_ok_and(|m| m.is_file() && m.len() > 0);
                if valid {
                    progress.insert(result.item_id);
                    report.downloaded += 1;
                } else {
                    warn!("下载的文件 {:?} 为空或不存在，已删除", path);
                    if path.exists()
                        && let Err(e) = fs::remove_file(&path)
                    {
                        warn!("删除无效文件 {:?} 失败: {}", path, e);
                    }
                    ui::warn(&format!("文件 '{}' 为空，已删除。", path.display()));
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or(result.item_id);
                    report.record_failure(name, FailureKind::EmptyFile.get_display_info().2);
                }
            }
            FetchOutcome::Failed { filepath, kind, .. } => {
                let name = filepath
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or(result.item_id);
                report.record_failure(name, kind.get_display_info().2);
            }
        }
    }
}

/// 相册目录存在但为空，说明文件被手动删除，需要重新下载
fn reset_progress_for_empty_dir(album: &AlbumRecord, progress: &mut ProgressSet) {
    let reset = progress.remove_all(album.item_ids());
    if reset > 0 {
        warn!("相册目录 '{}' 为空，已重置 {} 个项目的下载进度", album.name, reset);
        ui::warn(&format!(
            "相册目录 '{}' 为空，将重新下载 {} 个项目。",
            album.name, reset
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_file_name() {
        let item = MediaItem::new("123", "Sunset: day/1", MediaKind::Photo);
        assert_eq!(build_file_name(&item, "jpg"), "Sunset_ day_1_123.jpg");
        let untitled = MediaItem::new("456", "  ", MediaKind::Video);
        assert_eq!(build_file_name(&untitled, "mp4"), "456.mp4");
    }

    #[test]
    fn test_find_existing_file_checks_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a_1.jpg");
        assert!(find_existing_file(&target).is_none());

        // 空文件不算已下载
        fs::write(dir.path().join("a_1.png"), b"").unwrap();
        assert!(find_existing_file(&target).is_none());

        fs::write(dir.path().join("a_1.png"), b"data").unwrap();
        assert_eq!(find_existing_file(&target), Some(dir.path().join("a_1.png")));

        fs::write(&target, b"data").unwrap();
        assert_eq!(find_existing_file(&target), Some(target));
    }

    #[test]
    fn test_remove_stale_temp_files_keeps_media() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".flickr-dl-AbC123"), b"partial").unwrap();
        fs::write(dir.path().join("Beach_1.jpg"), b"data").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();

        assert_eq!(remove_stale_temp_files(dir.path()).unwrap(), 1);
        assert!(!dir.path().join(".flickr-dl-AbC123").exists());
        assert!(dir.path().join("Beach_1.jpg").exists());
        assert!(dir.path().join(".hidden").exists());
        assert_eq!(remove_stale_temp_files(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_writability_check() {
        let dir = tempfile::tempdir().unwrap();
        assert!(probe_writable(dir.path()).is_ok());
        assert!(probe_writable(&dir.path().join("missing")).is_err());
    }
}
