// src/analysis.rs

use crate::{
    RunContext,
    config::AppConfig,
    constants,
    downloader::count_local_files,
    error::*,
    models::RemoteAlbum,
    symbols, ui, utils,
};
use colored::*;
use log::info;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::Path,
};

const MISMATCH_FLAG: &str = "🚩";

/// 报告中的一行：一个远程相册，或一个没有对应相册的本地目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub name: String,
    pub remote: u64,
    pub photos: u64,
    pub videos: u64,
    pub local: u64,
    pub local_only: bool,
}

impl AuditRow {
    pub fn mismatched(&self) -> bool {
        self.remote != self.local
    }

    fn breakdown(&self) -> String {
        breakdown(self.photos, self.videos)
    }
}

fn breakdown(photos: u64, videos: u64) -> String {
    if videos > 0 {
        format!("{}p+{}v", photos, videos)
    } else {
        format!("{}p", photos)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub rows: Vec<AuditRow>,
}

impl AuditReport {
    /// (远程, 照片, 视频, 本地)
    pub fn totals(&self) -> (u64, u64, u64, u64) {
        self.rows.iter().fold((0, 0, 0, 0), |(r, p, v, l), row| {
            (r + row.remote, p + row.photos, v + row.videos, l + row.local)
        })
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &AuditRow> {
        self.rows.iter().filter(|row| row.mismatched())
    }

    pub fn write_csv(&self, path: &Path) -> AppResult<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let mut out = String::new();
        push_record(
            &mut out,
            &["Album Name", "Remote Items", "Breakdown (P+V)", "Local Items", "Diff Flag"],
        );
        for row in &self.rows {
            let name = if row.local_only {
                format!("[LOCAL ONLY] {}", row.name)
            } else {
                row.name.clone()
            };
            let flag = if row.mismatched() { MISMATCH_FLAG } else { "" };
            push_record(
                &mut out,
                &[
                    &name,
                    &row.remote.to_string(),
                    &row.breakdown(),
                    &row.local.to_string(),
                    flag,
                ],
            );
        }
        let (remote, photos, videos, local) = self.totals();
        let flag = if remote != local { MISMATCH_FLAG } else { "" };
        push_record(
            &mut out,
            &[
                "TOTAL",
                &remote.to_string(),
                &breakdown(photos, videos),
                &local.to_string(),
                flag,
            ],
        );

        let mut file = fs::File::create(path)?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

/// 含逗号、引号或换行的字段加引号，内部引号写两次
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_record(out: &mut String, fields: &[&str]) {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// 下载根目录下每个相册目录中的本地文件数（跳过隐藏目录）
pub fn local_counts(download_dir: &Path, download_video: bool) -> AppResult<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    if !download_dir.is_dir() {
        return Ok(counts);
    }
    for entry in fs::read_dir(download_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        let count = count_local_files(&entry.path(), download_video)?;
        counts.insert(name, count as u64);
    }
    Ok(counts)
}

/// 依次尝试：完全匹配、忽略大小写、互相包含
pub fn find_matching_dir<'a>(album_title: &str, dirs: &'a BTreeMap<String, u64>) -> Option<&'a str> {
    let sanitized = utils::sanitize_filename(album_title);
    if let Some((name, _)) = dirs.get_key_value(&sanitized) {
        return Some(name.as_str());
    }
    let lower = sanitized.to_lowercase();
    dirs.keys()
        .find(|name| name.to_lowercase() == lower)
        .or_else(|| {
            dirs.keys().find(|name| {
                let name = name.to_lowercase();
                name.contains(&lower) || lower.contains(&name)
            })
        })
        .map(String::as_str)
}

/// 按远程数量从大到小比较每个相册，最后追加没有对应相册的本地目录
pub fn build_report(
    albums: &[&RemoteAlbum],
    dirs: &BTreeMap<String, u64>,
    download_video: bool,
) -> AuditReport {
    let mut rows = Vec::with_capacity(albums.len());
    let mut used = BTreeSet::new();

    for album in albums {
        let remote = if download_video {
            album.photo_count + album.video_count
        } else {
            album.photo_count
        };
        let local = match find_matching_dir(&album.title, dirs) {
            Some(dir) => {
                used.insert(dir);
                dirs[dir]
            }
            None => 0,
        };
        rows.push(AuditRow {
            name: album.title.clone(),
            remote,
            photos: album.photo_count,
            videos: album.video_count,
            local,
            local_only: false,
        });
    }
    rows.sort_by(|a, b| b.remote.cmp(&a.remote));

    for (dir, count) in dirs.iter().filter(|(dir, _)| !used.contains(dir.as_str())) {
        rows.push(AuditRow {
            name: dir.clone(),
            remote: 0,
            photos: 0,
            videos: 0,
            local: *count,
            local_only: true,
        });
    }

    AuditReport { rows }
}

pub fn report_file_name(config: &AppConfig) -> String {
    let suffix = if config.download_video {
        "with_videos"
    } else {
        "photos_only"
    };
    format!("{}_{}.csv", constants::ANALYSIS_FILE_STEM, suffix)
}

/// 只读取相册列表和本地目录，不下载任何内容
pub async fn run(context: &RunContext) -> AppResult<AuditReport> {
    let config = &context.config;
    ui::print_header("Flickr 相册分析");
    ui::info(&format!(
        "视频文件: {}",
        if config.download_video { "计入" } else { "不计入" }
    ));
    ui::info(&format!("下载目录: {}", config.download_dir.display()));

    let user_id = context.service.login().await?;
    info!("分析模式，用户 ID: {}", user_id);

    let remote = context.service.list_albums().await?;
    let (selected, skipped): (Vec<&RemoteAlbum>, Vec<&RemoteAlbum>) = remote
        .iter()
        .partition(|album| !config.should_skip_album(&album.title));
    if !skipped.is_empty() {
        let names: Vec<&str> = skipped.iter().map(|a| a.title.as_str()).collect();
        ui::info(&format!("跳过 {} 个相册: {}", skipped.len(), names.join(", ")));
    }

    let dirs = local_counts(&config.download_dir, config.download_video)?;
    ui::info(&format!(
        "远程 {} 个相册, 本地 {} 个目录。",
        selected.len(),
        dirs.len()
    ));

    let report = build_report(&selected, &dirs, config.download_video);
    let path = config.cache_dir.join(report_file_name(config));
    report.write_csv(&path)?;
    info!("分析报告已写入 {:?}", path);

    for row in report.mismatches() {
        let label = if row.local_only { "[仅本地] " } else { "" };
        ui::warn(&format!(
            "{}{}: 远程 {}, 本地 {}",
            label, row.name, row.remote, row.local
        ));
    }

    let (remote_total, photos, videos, local_total) = report.totals();
    ui::print_sub_header("总计");
    println!(
        "远程 {} 项 ({} 张照片, {} 个视频), 本地 {} 项",
        remote_total, photos, videos, local_total
    );
    if remote_total == local_total {
        println!("{} 远程与本地数量一致。", *symbols::OK);
    } else {
        ui::warn(&format!(
            "相差 {} 项。",
            remote_total.abs_diff(local_total).to_string().bold()
        ));
    }
    println!("{} 报告已保存到: {}", *symbols::OK, path.display());
    Ok(report)
}
