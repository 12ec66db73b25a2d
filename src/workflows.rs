// src/workflows.rs

use crate::{
    RunContext,
    config::{AppConfig, RetryMode},
    constants,
    downloader::{AlbumDownloader, CompletionVerifier, OwnershipMap, RunSummary},
    error::AppResult,
    models::*,
    state::RunState,
    symbols, ui,
    utils::{self, AlbumFilter},
};
use colored::*;
use log::{debug, error, info, warn};
use std::fs;

/// 根据排除列表、相册过滤器和视频开关选出本次要处理的相册，保持远程顺序
pub fn select_albums<'a>(
    remote: &'a [RemoteAlbum],
    config: &AppConfig,
    filter: Option<&AlbumFilter>,
) -> Vec<&'a RemoteAlbum> {
    remote
        .iter()
        .filter(|album| {
            if config.should_skip_album(&album.title) {
                debug!("相册 '{}' 在排除列表中", album.title);
                return false;
            }
            filter.is_none_or(|f| f.matches(&album.title))
        })
        .filter(|album| {
            let video_only = album.photo_count == 0 && album.video_count > 0;
            if video_only && !config.download_video {
                info!("相册 '{}' 只包含视频，已按配置跳过", album.title);
                ui::info(&format!("跳过只包含视频的相册 '{}'。", album.title));
                return false;
            }
            true
        })
        .collect()
}

/// 一次完整的运行：登录、扫描、去重、下载、校验与重试
pub async fn run(context: &RunContext) -> AppResult<RunSummary> {
    let config = &context.config;
    let filter = config
        .album_filter
        .as_deref()
        .map(AlbumFilter::new)
        .transpose()?;

    ui::print_header("Flickr 相册下载");
    let user_id = context.service.login().await?;
    ui::info(&format!("已登录 Flickr (用户 ID: {})。", user_id));

    fs::create_dir_all(&config.download_dir)?;
    let absolute_path = dunce::canonicalize(&config.download_dir)?;
    info!("文件将保存到目录: \"{}\"", absolute_path.display());
    ui::info(&format!("文件将保存到目录: \"{}\"", absolute_path.display()));

    let mut state = RunState::load(config)?;
    ui::info(&format!(
        "已加载 {} 个已完成项目, {} 条 URL 缓存。",
        state.progress.len(),
        state.url_cache.len()
    ));

    let remote_albums = context.service.list_albums().await?;
    info!("远程共有 {} 个相册", remote_albums.len());
    let selected = select_albums(&remote_albums, config, filter.as_ref());
    if selected.is_empty() {
        report_no_match(&remote_albums, config, filter.as_ref());
        return Ok(RunSummary::default());
    }

    let mut summary = RunSummary::default();
    let albums = scan_albums(context, &selected, &mut summary).await;
    let ownership = OwnershipMap::build(&albums);
    if ownership.duplicate_count() > 0 {
        ui::info(&format!(
            "{} 个项目出现在多个相册中，每个项目只会下载到一个相册。",
            ownership.duplicate_count()
        ));
    }

    // 指定了过滤器时逐个相册立即校验，否则全部下载完成后统一校验
    let verify_immediately = filter.is_some();
    for (i, album) in albums.iter().enumerate() {
        ui::print_sub_header(&format!("相册 {}/{}: {}", i + 1, albums.len(), album.name));
        let report = download_album(context, album, &ownership, &mut state).await;
        summary.record(report);

        if verify_immediately && !verify_album(context, album, &ownership, &mut state).await {
            retry_albums(context, &[album], &ownership, &mut state, &mut summary).await;
        }
    }

    if !verify_immediately {
        ui::print_header("校验所有相册");
        let mut failing = Vec::new();
        for album in &albums {
            if !verify_album(context, album, &ownership, &mut state).await {
                failing.push(album);
            }
        }
        if !failing.is_empty() {
            retry_albums(context, &failing, &ownership, &mut state, &mut summary).await;
        }
    }

    summary.print_report();
    Ok(summary)
}

/// 获取每个相册的项目列表。单个相册失败只记录在统计中，不中止运行。
async fn scan_albums(
    context: &RunContext,
    selected: &[&RemoteAlbum],
    summary: &mut RunSummary,
) -> Vec<AlbumRecord> {
    ui::print_sub_header(&format!("扫描 {} 个相册", selected.len()));
    let mut albums = Vec::with_capacity(selected.len());
    for remote in selected {
        match fetch_album_record(context, remote).await {
            Ok(record) => {
                ui::plain(&format!(
                    "  {} {} ({} 张照片, {} 个视频, 本次处理 {} 项)",
                    *symbols::INFO,
                    record.name,
                    record.photo_count,
                    record.video_count,
                    record.items.len()
                ));
                albums.push(record);
            }
            Err(e) => {
                error!("获取相册 '{}' 的项目列表失败: {}", remote.title, e);
                ui::error(&format!("获取相册 '{}' 的项目列表失败: {}", remote.title, e));
                let mut report = AlbumReport::new(&utils::sanitize_filename(&remote.title));
                report.record_failure(&remote.title, "无法获取相册内容");
                summary.record(report);
            }
        }
    }
    albums
}

async fn fetch_album_record(context: &RunContext, remote: &RemoteAlbum) -> AppResult<AlbumRecord> {
    let download_video = context.config.download_video;
    let items: Vec<MediaItem> = context
        .service
        .list_album_items(&remote.id)
        .await?
        .into_iter()
        .filter(|item| download_video || !item.kind.is_video())
        .collect();
    Ok(AlbumRecord {
        id: remote.id.clone(),
        name: utils::sanitize_filename(&remote.title),
        photo_count: remote.photo_count,
        video_count: remote.video_count,
        items,
    })
}

async fn download_album(
    context: &RunContext,
    album: &AlbumRecord,
    ownership: &OwnershipMap,
    state: &mut RunState,
) -> AlbumReport {
    let work = ownership.work_list(album);
    match AlbumDownloader::new(context).run(album, &work, state).await {
        Ok(report) => report,
        Err(e) => {
            error!("处理相册 '{}' 失败: {}", album.name, e);
            ui::error(&format!("处理相册 '{}' 失败: {}", album.name, e));
            let mut report = AlbumReport::new(&album.name);
            let reason = e.to_string();
            for item in work.iter().filter(|i| !state.progress.contains(&i.id)) {
                report.record_failure(&item.id, reason.as_str());
            }
            report
        }
    }
}

/// 返回相册是否通过校验。目录无法解析时视为通过。
async fn verify_album(
    context: &RunContext,
    album: &AlbumRecord,
    ownership: &OwnershipMap,
    state: &mut RunState,
) -> bool {
    let album_dir = match AlbumDownloader::new(context).album_dir(&album.name) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("无法定位相册目录 '{}'，跳过校验: {}", album.name, e);
            return true;
        }
    };
    CompletionVerifier::new(context)
        .verify(&album.id, &album_dir, &album.name, ownership, &mut state.progress)
        .await
        .passed()
}

fn should_retry(mode: RetryMode, failing: &[&AlbumRecord]) -> bool {
    match mode {
        RetryMode::Auto => true,
        RetryMode::Never => false,
        RetryMode::Confirm => {
            ui::warn(&format!("{} 个相册缺少文件:", failing.len()));
            for album in failing {
                ui::plain(&format!("    - {}", album.name));
            }
            ui::confirm("是否重新下载这些相册中缺失的文件?", false)
        }
    }
}

/// 重新扫描校验失败的相册，下载不在进度中的项目后再次校验
async fn retry_albums(
    context: &RunContext,
    failing: &[&AlbumRecord],
    ownership: &OwnershipMap,
    state: &mut RunState,
    summary: &mut RunSummary,
) {
    for album in failing {
        if let Some(report) = summary.report_mut(&album.name) {
            report.verification_failed = true;
        }
    }

    if !should_retry(context.config.retry_mode, failing) {
        info!("用户选择不重试 {} 个校验失败的相册", failing.len());
        ui::info("未进行重试，下次运行时会重新下载缺失的文件。");
        return;
    }

    for album in failing {
        ui::print_sub_header(&format!("{} 重试相册: {}", *symbols::RETRY, album.name));
        let refreshed = match context.service.list_album_items(&album.id).await {
            Ok(items) => AlbumRecord {
                items: items
                    .into_iter()
                    .filter(|item| context.config.download_video || !item.kind.is_video())
                    .collect(),
                ..(*album).clone()
            },
            Err(e) => {
                error!("重新扫描相册 '{}' 失败: {}", album.name, e);
                ui::error(&format!("重新扫描相册 '{}' 失败: {}", album.name, e));
                continue;
            }
        };

        let pending = refreshed
            .items
            .iter()
            .filter(|i| !state.progress.contains(&i.id))
            .count();
        if pending == 0 {
            warn!("相册 '{}' 校验失败但没有待重试的项目", album.name);
            ui::warn("没有找到需要重试的文件。");
            continue;
        }
        ui::info(&format!("找到 {} 个需要重试的文件。", pending));

        let retry_report = download_album(context, &refreshed, ownership, state).await;
        let passed = verify_album(context, &refreshed, ownership, state).await;
        if let Some(report) = summary.report_mut(&album.name) {
            report.absorb(&retry_report);
            report.verification_failed = !passed;
        }
        if passed {
            println!("{} 相册 '{}' 重试后校验通过。", *symbols::OK, album.name);
        } else {
            ui::warn(&format!("相册 '{}' 重试后仍缺少文件。", album.name));
        }
    }
}

/// 过滤器没有匹配到相册时，列出部分可用相册
fn report_no_match(remote: &[RemoteAlbum], config: &AppConfig, filter: Option<&AlbumFilter>) {
    let Some(filter) = filter else {
        ui::warn("没有需要处理的相册。");
        return;
    };
    ui::warn(&format!("没有相册匹配 '{}'。", filter.pattern()));

    let available: Vec<&RemoteAlbum> = remote
        .iter()
        .filter(|a| !config.should_skip_album(&a.title))
        .collect();
    if available.is_empty() {
        return;
    }
    ui::plain(&format!("{}", "可用的相册:".bold()));
    for album in available.iter().take(constants::MAX_LISTED_ALBUMS) {
        ui::plain(&format!("  - {}", album.title));
    }
    if available.len() > constants::MAX_LISTED_ALBUMS {
        ui::plain(&format!(
            "  ... 以及其他 {} 个相册",
            available.len() - constants::MAX_LISTED_ALBUMS
        ));
    }
}
