// src/models/mod.rs

pub mod api;

use crate::{constants, error::AppError, symbols};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

// 1. 媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
}

impl MediaKind {
    /// 远程服务以字符串给出类型，未知值一律按照片处理。
    pub fn from_remote(media: &str) -> Self {
        if media.eq_ignore_ascii_case("video") {
            MediaKind::Video
        } else {
            MediaKind::Photo
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => constants::extensions::DEFAULT_PHOTO,
            MediaKind::Video => constants::extensions::DEFAULT_VIDEO,
        }
    }

    pub fn is_video(&self) -> bool {
        *self == MediaKind::Video
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

// 2. 领域对象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
        }
    }
}

/// 某个媒体项目的一个可下载尺寸
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCandidate {
    pub url: String,
    pub label: String,
    pub width: u64,
    pub height: u64,
    pub size: u64,
}

impl AssetCandidate {
    pub fn is_original(&self) -> bool {
        self.label.eq_ignore_ascii_case("original")
    }

    pub fn resolution(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }

    /// 标签或链接表明这是一个视频流
    pub fn looks_like_video(&self) -> bool {
        self.url.contains("/play/") || self.label.to_lowercase().contains("video")
    }
}

/// 相册列表中返回的基本信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAlbum {
    pub id: String,
    pub title: String,
    pub photo_count: u64,
    pub video_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlbumCounts {
    pub photos: u64,
    pub videos: u64,
}

#[derive(Debug, Clone)]
pub struct AlbumRecord {
    pub id: String,
    /// 已清理的相册名，同时作为目录名
    pub name: String,
    pub photo_count: u64,
    pub video_count: u64,
    pub items: Vec<MediaItem>,
}

impl AlbumRecord {
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }
}

/// 质量选择的结果，同时也是 URL 缓存中的条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAsset {
    pub url: String,
    pub media_type: MediaKind,
    pub selected_info: String,
}

/// 交给并发池的单个下载任务
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub item_id: String,
    pub url: String,
    pub filepath: PathBuf,
    pub kind: MediaKind,
}

// 3. 下载失败的分类
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FailureKind {
    HttpError,
    NetworkError,
    ConnectionError,
    TimeoutError,
    IoError,
    EmptyFile,
    ResolveError,
    UnexpectedError,
}

impl FailureKind {
    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            FailureKind::HttpError => (&symbols::ERROR, |s| s.red(), "服务器返回错误"),
            FailureKind::NetworkError => (&symbols::ERROR, |s| s.red(), "网络请求失败"),
            FailureKind::ConnectionError => (&symbols::ERROR, |s| s.red(), "无法建立连接"),
            FailureKind::TimeoutError => (&symbols::WARN, |s| s.yellow(), "网络连接超时"),
            FailureKind::IoError => (&symbols::ERROR, |s| s.red(), "本地文件读写错误"),
            FailureKind::EmptyFile => (&symbols::WARN, |s| s.yellow(), "文件为空或不存在"),
            FailureKind::ResolveError => (&symbols::ERROR, |s| s.red(), "无法获取下载地址"),
            FailureKind::UnexpectedError => {
                (&symbols::ERROR, |s| s.red(), "发生未预期的程序错误")
            }
        }
    }
}

impl From<&AppError> for FailureKind {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                if err.is_timeout() {
                    FailureKind::TimeoutError
                } else if err.is_connect() {
                    FailureKind::ConnectionError
                } else if err.is_status() {
                    FailureKind::HttpError
                } else {
                    FailureKind::NetworkError
                }
            }
            AppError::NetworkMiddleware(_) => FailureKind::NetworkError,
            AppError::Io(_) | AppError::TempFilePersist(_) => FailureKind::IoError,
            AppError::Api { .. } | AppError::RetriesExhausted { .. } => FailureKind::ResolveError,
            _ => FailureKind::UnexpectedError,
        }
    }
}

/// 并发任务的返回值。任务本身从不修改共享状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved(PathBuf),
    Failed {
        filepath: PathBuf,
        kind: FailureKind,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub item_id: String,
    pub outcome: FetchOutcome,
}

// 4. 统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumReport {
    pub album: String,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// (文件名或项目 ID, 原因)
    pub failures: Vec<(String, String)>,
    /// 最后一次完整性校验仍未通过
    pub verification_failed: bool,
}

impl AlbumReport {
    pub fn new(album: &str) -> Self {
        Self {
            album: album.to_string(),
            ..Default::default()
        }
    }

    pub fn record_failure(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push((name.into(), reason.into()));
    }

    /// 合并重试结果。重试覆盖了所有未完成的项目，因此失败数以重试为准。
    pub fn absorb(&mut self, retry: &AlbumReport) {
        self.downloaded += retry.downloaded;
        self.failed = retry.failed;
        self.failures = retry.failures.clone();
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.verification_failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Passed,
    /// 本地文件多于预期，不做任何删除
    Extra(usize),
    /// 本地文件缺失，返回被重置的进度条目数
    Missing { reset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub expected: usize,
    pub actual: usize,
    pub outcome: VerificationOutcome,
}

impl Verification {
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, VerificationOutcome::Missing { .. })
    }
}
