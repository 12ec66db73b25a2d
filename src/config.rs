// src/config.rs

pub mod file;

use self::file::{EnvLookup, load_or_create_external_config, resolve_credentials};
use crate::{
    cli::Cli,
    constants,
    error::{AppError, AppResult},
    remote::rate_limit::RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub api_endpoint: Option<String>,
    pub api_call_delay_secs: Option<f64>,
    pub api_timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_secs: Option<u64>,
    pub max_backoff_secs: Option<u64>,
    pub fetch_max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadConfig {
    pub download_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub download_video: Option<bool>,
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub skip_albums: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        // 为 NetworkConfig 提供一组稳健的默认值
        let network = NetworkConfig {
            api_endpoint: Some(constants::api::REST_ENDPOINT.into()),
            api_call_delay_secs: Some(constants::DEFAULT_API_CALL_DELAY_SECS),
            api_timeout_secs: Some(constants::network::API_TIMEOUT_SECS),
            fetch_timeout_secs: Some(constants::network::FETCH_TIMEOUT_SECS),
            connect_timeout_secs: Some(constants::network::CONNECT_TIMEOUT_SECS),
            max_attempts: Some(constants::network::MAX_ATTEMPTS),
            initial_backoff_secs: Some(constants::network::INITIAL_BACKOFF_SECS),
            max_backoff_secs: Some(constants::network::MAX_BACKOFF_SECS),
            fetch_max_retries: Some(constants::network::FETCH_MAX_RETRIES),
        };
        let download = DownloadConfig {
            download_dir: Some(PathBuf::from(constants::DEFAULT_DOWNLOAD_DIR)),
            cache_dir: Some(PathBuf::from(constants::DEFAULT_CACHE_DIR)),
            download_video: Some(true),
            max_workers: Some(constants::DEFAULT_MAX_WORKERS),
            skip_albums: Vec::new(),
        };

        Self {
            credentials: CredentialsConfig::default(),
            network,
            download,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub auth_token: Option<String>,
}

/// 校验失败后的重试方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    Auto,
    Confirm,
    Never,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub credentials_source: String,
    pub api_endpoint: String,
    pub user_agent: String,
    pub download_video: bool,
    pub download_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_workers: usize,
    pub api_call_delay: Duration,
    pub retry_policy: RetryPolicy,
    pub api_timeout: Duration,
    pub fetch_timeout: Duration,
    pub connect_timeout: Duration,
    pub fetch_max_retries: u32,
    pub skip_albums: Vec<String>,
    pub include_auto_upload: bool,
    pub album_filter: Option<String>,
    pub retry_mode: RetryMode,
    pub refresh_url_cache: bool,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        Self::from_sources(args, external_config, &|key: &str| std::env::var(key).ok())
    }

    /// 按 命令行 > 环境变量 > 配置文件 > 默认值 的优先级合并配置
    pub fn from_sources(args: &Cli, external: ExternalConfig, env: EnvLookup<'_>) -> AppResult<Self> {
        let (credentials, credentials_source) = resolve_credentials(&external.credentials, env);
        let network = external.network;
        let download = external.download;

        let download_video = if args.no_video {
            false
        } else {
            env("DOWNLOAD_VIDEO")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .or(download.download_video)
                .unwrap_or(true)
        };

        let max_workers = match args.workers {
            Some(w) => w,
            None => match env("MAX_WORKERS") {
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| AppError::Config(format!("MAX_WORKERS 不是有效的整数: '{}'", raw)))?,
                None => download.max_workers.unwrap_or(constants::DEFAULT_MAX_WORKERS),
            },
        };

        let delay_secs = match env("API_CALL_DELAY") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Config(format!("API_CALL_DELAY 不是有效的数字: '{}'", raw)))?,
            None => network
                .api_call_delay_secs
                .unwrap_or(constants::DEFAULT_API_CALL_DELAY_SECS),
        };
        if !(delay_secs >= 0.0 && delay_secs.is_finite()) {
            return Err(AppError::Config("API_CALL_DELAY 不能为负数".to_string()));
        }
        let delay_secs = delay_secs.min(constants::network::MAX_DELAY_SECS as f64);

        let mut skip_albums = download.skip_albums;
        if let Some(raw) = env("SKIP_ALBUMS") {
            skip_albums.extend(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            );
        }

        let retry_mode = if args.no_retry {
            RetryMode::Never
        } else if args.yes {
            RetryMode::Auto
        } else {
            RetryMode::Confirm
        };

        let retry_policy = RetryPolicy {
            max_attempts: network.max_attempts.unwrap_or(constants::network::MAX_ATTEMPTS),
            initial_backoff: Duration::from_secs(
                network
                    .initial_backoff_secs
                    .unwrap_or(constants::network::INITIAL_BACKOFF_SECS)
                    .min(constants::network::MAX_DELAY_SECS),
            ),
            max_backoff: Duration::from_secs(
                network
                    .max_backoff_secs
                    .unwrap_or(constants::network::MAX_BACKOFF_SECS)
                    .min(constants::network::MAX_DELAY_SECS),
            ),
            ..RetryPolicy::default()
        };

        Ok(Self {
            credentials,
            credentials_source,
            api_endpoint: network
                .api_endpoint
                .unwrap_or_else(|| constants::api::REST_ENDPOINT.to_string()),
            user_agent: constants::USER_AGENT.into(),
            download_video,
            download_dir: args
                .output
                .clone()
                .or_else(|| env("DOWNLOAD_DIR").map(PathBuf::from))
                .or(download.download_dir)
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_DOWNLOAD_DIR)),
            cache_dir: download
                .cache_dir
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_CACHE_DIR)),
            max_workers,
            api_call_delay: Duration::from_secs_f64(delay_secs),
            retry_policy,
            api_timeout: Duration::from_secs(
                network
                    .api_timeout_secs
                    .unwrap_or(constants::network::API_TIMEOUT_SECS),
            ),
            fetch_timeout: Duration::from_secs(
                network
                    .fetch_timeout_secs
                    .unwrap_or(constants::network::FETCH_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                network
                    .connect_timeout_secs
                    .unwrap_or(constants::network::CONNECT_TIMEOUT_SECS),
            ),
            fetch_max_retries: network
                .fetch_max_retries
                .unwrap_or(constants::network::FETCH_MAX_RETRIES),
            skip_albums,
            include_auto_upload: args.include_auto_upload,
            album_filter: args.album.clone(),
            retry_mode,
            refresh_url_cache: args.refresh_urls,
        })
    }

    /// 在发起任何远程调用之前检查配置
    pub fn validate(&self) -> AppResult<()> {
        if self.credentials.api_key.is_empty() || self.credentials.api_secret.is_empty() {
            return Err(AppError::CredentialsMissing);
        }
        if self.max_workers < 1 {
            return Err(AppError::Config("MAX_WORKERS 至少为 1".to_string()));
        }
        if self.retry_policy.max_attempts < 1 {
            return Err(AppError::Config("max_attempts 至少为 1".to_string()));
        }
        Ok(())
    }

    /// 相册是否在排除列表中（包括固定排除的自动上传相册）
    pub fn should_skip_album(&self, album_title: &str) -> bool {
        if !self.include_auto_upload && album_title.starts_with(constants::AUTO_UPLOAD_ALBUM) {
            return true;
        }
        self.skip_albums.iter().any(|s| s == album_title)
    }

    pub fn progress_file(&self) -> PathBuf {
        self.cache_dir.join(constants::PROGRESS_FILE_NAME)
    }

    pub fn url_cache_file(&self) -> PathBuf {
        self.cache_dir.join(constants::URL_CACHE_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join(constants::LOG_FILE_NAME)
    }
}

#[cfg(feature = "testing")]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials {
                api_key: "test-key".to_string(),
                api_secret: "test-secret".to_string(),
                auth_token: None,
            },
            credentials_source: "测试".to_string(),
            api_endpoint: constants::api::REST_ENDPOINT.to_string(),
            user_agent: "test-agent/1.0".to_string(),
            download_video: true,
            download_dir: PathBuf::from(constants::DEFAULT_DOWNLOAD_DIR),
            cache_dir: PathBuf::from(constants::DEFAULT_CACHE_DIR),
            max_workers: 4,
            api_call_delay: Duration::ZERO,
            retry_policy: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(50),
                ..RetryPolicy::default()
            },
            api_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            fetch_max_retries: 0,
            skip_albums: Vec::new(),
            include_auto_upload: false,
            album_filter: None,
            retry_mode: RetryMode::Auto,
            refresh_url_cache: false,
        }
    }
}
