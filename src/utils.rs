// src/utils.rs

use crate::{constants, error::*, models::MediaKind};
use anyhow::Context;
use indicatif::HumanBytes;
use regex::Regex;
use std::sync::LazyLock;
use std::{
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};
use url::Url;

static ILLEGAL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|\x00-\x1f]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PLAUSIBLE_EXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{2,5}$").unwrap());

pub fn sanitize_filename(name: &str) -> String {
    let original_name = name.trim();
    if original_name.is_empty() { return "unknown".to_string(); }

    let stem = Path::new(original_name)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(original_name))
        .to_string_lossy()
        .to_uppercase();
    let windows_reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
        "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let mut name = if windows_reserved.contains(&stem.as_ref()) {
        format!("_{}", original_name)
    } else {
        original_name.to_string()
    };

    name = ILLEGAL_CHARS_RE.replace_all(&name, "_").into_owned();
    name = WHITESPACE_RE.replace_all(&name, " ").trim().to_string();
    name = name.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    if name.is_empty() { return "unnamed".to_string(); }

    if name.len() > constants::MAX_FILENAME_BYTES {
        name = safe_truncate_utf8(&name, constants::MAX_FILENAME_BYTES).to_string();
    }
    name
}

fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes { return s; }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) { i -= 1; }
    &s[..i]
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}

/// 用于描述信息的大小后缀，大小未知时为空串
pub fn size_suffix(size_bytes: u64) -> String {
    if size_bytes == 0 {
        String::new()
    } else {
        format!(" ({})", HumanBytes(size_bytes))
    }
}

/// 相册名通配过滤器，支持 `*` 与 `?`
#[derive(Debug, Clone)]
pub struct AlbumFilter {
    pattern: String,
    regex: Regex,
}

impl AlbumFilter {
    pub fn new(pattern: &str) -> AppResult<Self> {
        let mut expr = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr)
            .with_context(|| format!("无效的相册过滤模式 '{}'", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, album_title: &str) -> bool {
        self.regex.is_match(album_title)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// 从下载链接的路径部分推断扩展名（不含点），并按媒体类型修正。
pub fn extension_from_url(url: &str, kind: MediaKind) -> String {
    let from_path = Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
        })
        .filter(|ext| PLAUSIBLE_EXT_RE.is_match(ext));

    match from_path {
        Some(ext) if kind.is_video() && constants::extensions::IMAGE.contains(&ext.as_str()) => {
            constants::extensions::DEFAULT_VIDEO.to_string()
        }
        Some(ext) => ext,
        None => kind.default_extension().to_string(),
    }
}

/// 根据响应的 Content-Type 决定最终扩展名
pub fn extension_from_content_type(content_type: &str, kind: MediaKind) -> &'static str {
    let content_type = content_type.to_lowercase();
    if content_type.contains("video") || kind.is_video() {
        if content_type.contains("quicktime") || content_type.contains("mov") {
            "mov"
        } else {
            "mp4"
        }
    } else if content_type.contains("image") {
        if content_type.contains("png") {
            "png"
        } else if content_type.contains("gif") {
            "gif"
        } else {
            "jpg"
        }
    } else {
        kind.default_extension()
    }
}

pub fn is_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| constants::extensions::VIDEO.contains(&ext.to_lowercase().as_str()))
}

pub fn secure_join_path(base_dir: &Path, relative_path: &Path) -> AppResult<PathBuf> {
    let resolved_base = dunce::canonicalize(base_dir).with_context(|| format!("基础目录 '{:?}' 不存在或无法访问", base_dir))?;
    let mut final_path = resolved_base.clone();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => final_path.push(part),
            Component::ParentDir => return Err(AppError::Config("检测到路径遍历 '..' ".to_string())),
            _ => continue,
        }
    }
    if !final_path.starts_with(&resolved_base) {
        return Err(AppError::Config(format!("路径遍历攻击检测: '{:?}'", relative_path)));
    }
    Ok(final_path)
}
