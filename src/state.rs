// src/state.rs

use crate::{config::AppConfig, constants, error::*, models::ResolvedAsset};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// 先写入同目录下的临时文件再原子替换，避免中断时留下半截 JSON
fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(constants::TEMP_FILE_PREFIX)
        .tempfile_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), value)?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// 读取 JSON 文档。文件不存在时返回默认值，文件损坏时记录警告并返回默认值。
fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path, label: &str) -> AppResult<T> {
    if !path.is_file() {
        debug!("{} 文件 {:?} 不存在，使用空状态", label, path);
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("{} 文件 {:?} 无法解析 ({})，将重新开始记录", label, path, e);
            Ok(T::default())
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct ProgressDocument {
    #[serde(default)]
    downloaded_ids: Vec<String>,
}

/// 已确认下载完成的媒体 ID 集合
#[derive(Debug)]
pub struct ProgressSet {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl ProgressSet {
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let doc: ProgressDocument = read_json_or_default(&path, "下载进度")?;
        let ids: BTreeSet<String> = doc.downloaded_ids.into_iter().collect();
        info!("已加载下载进度: {} 个已完成项目", ids.len());
        Ok(Self { path, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// 移除一组 ID，返回实际被移除的数量
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        ids.into_iter().filter(|id| self.ids.remove(*id)).count()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn save(&self) -> AppResult<()> {
        let doc = ProgressDocument {
            downloaded_ids: self.ids.iter().cloned().collect(),
        };
        write_json_atomically(&self.path, &doc)?;
        debug!("下载进度已保存 ({} 项) 到 {:?}", self.ids.len(), self.path);
        Ok(())
    }
}

/// 已解析下载地址的缓存，键为 `<id>_info`
#[derive(Debug)]
pub struct UrlCache {
    path: PathBuf,
    entries: BTreeMap<String, ResolvedAsset>,
}

impl UrlCache {
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let entries: BTreeMap<String, ResolvedAsset> = read_json_or_default(&path, "URL 缓存")?;
        info!("已加载 URL 缓存: {} 条记录", entries.len());
        Ok(Self { path, entries })
    }

    fn key(item_id: &str) -> String {
        format!("{}_info", item_id)
    }

    pub fn get(&self, item_id: &str) -> Option<&ResolvedAsset> {
        self.entries.get(&Self::key(item_id))
    }

    pub fn insert(&mut self, item_id: &str, asset: ResolvedAsset) {
        self.entries.insert(Self::key(item_id), asset);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> AppResult<()> {
        write_json_atomically(&self.path, &self.entries)
    }
}

/// 一次运行中可变的持久化状态，只在控制流程上修改
#[derive(Debug)]
pub struct RunState {
    pub progress: ProgressSet,
    pub url_cache: UrlCache,
}

impl RunState {
    pub fn load(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            progress: ProgressSet::load(config.progress_file())?,
            url_cache: UrlCache::load(config.url_cache_file())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn test_progress_roundtrip_uses_documented_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut progress = ProgressSet::load(&path).unwrap();
        assert!(progress.is_empty());
        progress.insert("b");
        progress.insert("a");
        progress.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"downloaded_ids": ["a", "b"]}));

        let mut reloaded = ProgressSet::load(&path).unwrap();
        assert!(reloaded.contains("a"));
        assert_eq!(reloaded.remove_all(["a", "missing"]), 1);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_corrupt_progress_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ProgressSet::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_url_cache_keys_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("url_cache.json");

        let mut cache = UrlCache::load(&path).unwrap();
        cache.insert(
            "123",
            ResolvedAsset {
                url: "https://x/123_o.jpg".into(),
                media_type: MediaKind::Photo,
                selected_info: "Original (10x10)".into(),
            },
        );
        cache.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["123_info"]["media_type"], "photo");
        assert_eq!(raw["123_info"]["url"], "https://x/123_o.jpg");

        let reloaded = UrlCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("123").unwrap().selected_info, "Original (10x10)");
        assert!(reloaded.get("123_info").is_none());
    }
}
