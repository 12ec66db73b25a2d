// src/models/api.rs

use serde::{Deserialize, Deserializer};

// --- 通用结构体 ---

/// Flickr 对部分数字字段有时返回字符串，有时返回数字
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Float(f64),
        Str(String),
    }

    Ok(match Option::<NumOrStr>::deserialize(deserializer)? {
        Some(NumOrStr::Num(n)) => n,
        Some(NumOrStr::Float(f)) if f >= 0.0 => f as u64,
        Some(NumOrStr::Str(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiFailure {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// --- flickr.test.login ---

#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub user: LoginUser,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginUser {
    pub id: String,
    #[serde(default)]
    pub username: Content,
}

// --- flickr.photosets.getList ---

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetListResponse {
    pub photosets: PhotosetList,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetList {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub pages: u64,
    #[serde(default)]
    pub photoset: Vec<PhotosetSummary>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetSummary {
    pub id: String,
    #[serde(default)]
    pub title: Content,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub photos: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub videos: u64,
}

// --- flickr.photosets.getInfo ---

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetInfoResponse {
    pub photoset: PhotosetInfo,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetInfo {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count_photos: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count_videos: u64,
}

// --- flickr.photosets.getPhotos ---

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetPhotosResponse {
    pub photoset: PhotosetPhotos,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetPhotos {
    #[serde(default)]
    pub photo: Vec<PhotosetPhoto>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub pages: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotosetPhoto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_media")]
    pub media: String,
}

fn default_media() -> String {
    "photo".to_string()
}

// --- flickr.photos.getInfo ---

#[derive(Deserialize, Debug, Clone)]
pub struct PhotoInfoResponse {
    pub photo: PhotoInfo,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotoInfo {
    pub id: String,
    #[serde(default = "default_media")]
    pub media: String,
}

// --- flickr.photos.getSizes ---

#[derive(Deserialize, Debug, Clone)]
pub struct SizesResponse {
    pub sizes: SizeList,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SizeList {
    #[serde(default)]
    pub size: Vec<SizeEntry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SizeEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub width: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub height: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
    pub source: String,
}
