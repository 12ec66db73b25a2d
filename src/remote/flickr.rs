// src/remote/flickr.rs

use super::{
    PhotoService,
    rate_limit::{RateLimitedCaller, RemoteError},
};
use crate::{
    config::{AppConfig, Credentials},
    constants::api::{self, methods},
    error::*,
    models::{api::*, *},
};
use async_trait::async_trait;
use log::{debug, info};
use md5::{Digest, Md5};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

type Params = Vec<(&'static str, String)>;

/// 基于 Flickr REST 接口的 `PhotoService` 实现
pub struct FlickrService {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    caller: Arc<RateLimitedCaller>,
    user_id: OnceLock<String>,
}

impl FlickrService {
    pub fn new(config: &AppConfig, caller: Arc<RateLimitedCaller>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.api_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.api_endpoint.clone(),
            credentials: config.credentials.clone(),
            caller,
            user_id: OnceLock::new(),
        })
    }

    /// 组装完整的查询参数；配置了 auth_token 时附加 api_sig 签名
    fn build_query(&self, method: &str, params: &[(&'static str, String)]) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = vec![
            ("method".into(), method.to_string()),
            ("api_key".into(), self.credentials.api_key.clone()),
            ("format".into(), "json".into()),
            ("nojsoncallback".into(), "1".into()),
        ];
        query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

        if let Some(token) = &self.credentials.auth_token {
            query.push(("auth_token".into(), token.clone()));
            let signature = sign(&self.credentials.api_secret, &query);
            query.push(("api_sig".into(), signature));
        }
        query
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, RemoteError> {
        let query = self.build_query(method, params);
        let res = self.http.get(&self.endpoint).query(&query).send().await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(RemoteError::RateLimited(format!("HTTP {}", status)));
        }
        let res = res.error_for_status()?;
        let body: Value = res.json().await?;
        parse_envelope(method, body)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Params) -> AppResult<T> {
        debug!("调用 Flickr API: {} {:?}", method, params);
        self.caller
            .call(method, || self.send_once::<T>(method, &params))
            .await
    }

    fn user_params(&self) -> Params {
        self.user_id
            .get()
            .map(|id| vec![("user_id", id.clone())])
            .unwrap_or_default()
    }
}

/// Flickr 旧式签名: md5(secret + 按键排序后拼接的 key/value)
fn sign(secret: &str, query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    for (k, v) in pairs {
        hasher.update(k.as_bytes());
        hasher.update(v.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn parse_envelope<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, RemoteError> {
    if body.get("stat").and_then(Value::as_str) == Some("fail") {
        let failure: ApiFailure = serde_json::from_value(body).map_err(|source| {
            RemoteError::Fatal(AppError::ApiParseFailed {
                method: method.to_string(),
                source,
            })
        })?;
        if api::BUSY_CODES.contains(&failure.code) {
            return Err(RemoteError::RateLimited(format!(
                "代码 {}: {}",
                failure.code, failure.message
            )));
        }
        return Err(RemoteError::Fatal(AppError::Api {
            code: failure.code,
            message: failure.message,
        }));
    }
    serde_json::from_value(body).map_err(|source| {
        RemoteError::Fatal(AppError::ApiParseFailed {
            method: method.to_string(),
            source,
        })
    })
}

#[async_trait]
impl PhotoService for FlickrService {
    async fn login(&self) -> AppResult<String> {
        let response: LoginResponse = self.request(methods::TEST_LOGIN, vec![]).await?;
        info!(
            "已登录 Flickr 用户 '{}' (ID: {})",
            response.user.username.content, response.user.id
        );
        let _ = self.user_id.set(response.user.id.clone());
        Ok(response.user.id)
    }

    async fn list_albums(&self) -> AppResult<Vec<RemoteAlbum>> {
        let mut albums = Vec::new();
        let mut page = 1u64;
        loop {
            let mut params = self.user_params();
            params.push(("per_page", api::PER_PAGE.to_string()));
            params.push(("page", page.to_string()));
            let response: PhotosetListResponse =
                self.request(methods::PHOTOSETS_GET_LIST, params).await?;
            albums.extend(response.photosets.photoset.into_iter().map(|set| RemoteAlbum {
                id: set.id,
                title: set.title.content,
                photo_count: set.photos,
                video_count: set.videos,
            }));
            if page >= response.photosets.pages {
                break;
            }
            page += 1;
        }
        Ok(albums)
    }

    async fn album_counts(&self, album_id: &str) -> AppResult<AlbumCounts> {
        let response: PhotosetInfoResponse = self
            .request(
                methods::PHOTOSETS_GET_INFO,
                vec![("photoset_id", album_id.to_string())],
            )
            .await?;
        Ok(AlbumCounts {
            photos: response.photoset.count_photos,
            videos: response.photoset.count_videos,
        })
    }

    async fn list_album_items(&self, album_id: &str) -> AppResult<Vec<MediaItem>> {
        let mut items = Vec::new();
        let mut page = 1u64;
        loop {
            let mut params = self.user_params();
            params.extend([
                ("photoset_id", album_id.to_string()),
                ("extras", "media".to_string()),
                ("per_page", api::PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let response: PhotosetPhotosResponse =
                self.request(methods::PHOTOSETS_GET_PHOTOS, params).await?;
            items.extend(
                response
                    .photoset
                    .photo
                    .into_iter()
                    .map(|p| MediaItem::new(p.id, p.title, MediaKind::from_remote(&p.media))),
            );
            if page >= response.photoset.pages {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    async fn media_kind(&self, item_id: &str) -> AppResult<MediaKind> {
        let response: PhotoInfoResponse = self
            .request(methods::PHOTOS_GET_INFO, vec![("photo_id", item_id.to_string())])
            .await?;
        Ok(MediaKind::from_remote(&response.photo.media))
    }

    async fn asset_candidates(&self, item_id: &str) -> AppResult<Vec<AssetCandidate>> {
        let response: SizesResponse = self
            .request(methods::PHOTOS_GET_SIZES, vec![("photo_id", item_id.to_string())])
            .await?;
        Ok(response
            .sizes
            .size
            .into_iter()
            .map(|s| AssetCandidate {
                url: s.source,
                label: s.label,
                width: s.width,
                height: s.height,
                size: s.size,
            })
            .collect())
    }
}
