// src/downloader/resolver.rs

use crate::{
    constants,
    models::{AlbumRecord, MediaItem},
};
use log::debug;
use std::collections::{HashMap, HashSet};

fn is_auto_upload(album_name: &str) -> bool {
    album_name.starts_with(constants::AUTO_UPLOAD_ALBUM)
}

/// 在包含同一项目的多个相册中选出规范相册，返回其在列表中的下标。
/// 优先第一个非自动上传相册，全部是自动上传相册时取第一个。
pub fn choose_canonical(album_names: &[&str]) -> Option<usize> {
    if album_names.is_empty() {
        return None;
    }
    album_names
        .iter()
        .position(|name| !is_auto_upload(name))
        .or(Some(0))
}

/// 媒体 ID 到其唯一规范相册 ID 的映射，每次运行根据扫描结果重建
#[derive(Debug, Default)]
pub struct OwnershipMap {
    owners: HashMap<String, String>,
    duplicates: usize,
}

impl OwnershipMap {
    /// 按扫描顺序构建映射，结果依赖相册顺序
    pub fn build<'a>(albums: impl IntoIterator<Item = &'a AlbumRecord>) -> Self {
        // 每个项目的相册列表保持扫描顺序
        let mut memberships: HashMap<&'a str, Vec<(&'a str, &'a str)>> = HashMap::new();
        for album in albums {
            for item_id in album.item_ids() {
                let entry = memberships.entry(item_id).or_default();
                if !entry.iter().any(|(id, _)| *id == album.id) {
                    entry.push((album.id.as_str(), album.name.as_str()));
                }
            }
        }

        let mut owners = HashMap::with_capacity(memberships.len());
        let mut duplicates = 0;
        for (item_id, containing) in memberships {
            let names: Vec<&str> = containing.iter().map(|(_, name)| *name).collect();
            if let Some(index) = choose_canonical(&names) {
                if containing.len() > 1 {
                    duplicates += 1;
                    debug!(
                        "项目 {} 出现在 {:?} 中，归属于 '{}'",
                        item_id, names, names[index]
                    );
                }
                owners.insert(item_id.to_string(), containing[index].0.to_string());
            }
        }

        Self { owners, duplicates }
    }

    pub fn owner_of(&self, item_id: &str) -> Option<&str> {
        self.owners.get(item_id).map(String::as_str)
    }

    /// 项目属于该相册，或者尚无已知归属
    pub fn is_owned_by(&self, album_id: &str, item_id: &str) -> bool {
        self.owner_of(item_id).is_none_or(|owner| owner == album_id)
    }

    /// 该相册需要下载的项目：去掉归属其他相册的项目，相册内重复的 ID 只保留一次
    pub fn work_list(&self, album: &AlbumRecord) -> Vec<MediaItem> {
        let mut seen = HashSet::new();
        album
            .items
            .iter()
            .filter(|item| self.is_owned_by(&album.id, &item.id))
            .filter(|item| seen.insert(item.id.as_str()))
            .cloned()
            .collect()
    }

    /// 出现在多个相册中的项目数量
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
