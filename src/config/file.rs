// src/config/file.rs

use crate::{
    config::{Credentials, CredentialsConfig, ExternalConfig},
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::PathBuf};

/// 环境变量查询函数，便于测试时注入
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(super) fn get_config_path() -> AppResult<PathBuf> {
    let path = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
        .join(constants::CONFIG_DIR_NAME)
        .join(constants::CONFIG_FILE_NAME);
    Ok(path)
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("配置文件 {:?} 不存在，将创建默认配置。", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

fn first_non_empty(env: EnvLookup<'_>, keys: &[&str]) -> Option<(String, String)> {
    keys.iter().find_map(|key| {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (v.trim().to_string(), key.to_string()))
    })
}

/// 逐项解析凭据：环境变量优先，其次是配置文件。返回凭据及其来源说明。
pub fn resolve_credentials(file: &CredentialsConfig, env: EnvLookup<'_>) -> (Credentials, String) {
    let mut sources = Vec::new();

    let mut pick = |keys: &[&str], from_file: &Option<String>, label: &str| -> String {
        if let Some((value, key)) = first_non_empty(env, keys) {
            debug!("使用来自环境变量 {} 的 {}", key, label);
            sources.push(format!("环境变量 ({})", key));
            return value;
        }
        match from_file.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                debug!("使用来自本地配置文件的 {}", label);
                sources.push("本地配置文件".to_string());
                value.to_string()
            }
            _ => String::new(),
        }
    };

    let api_key = pick(&["FLICKR_API_KEY", "API_KEY"], &file.api_key, "API Key");
    let api_secret = pick(&["FLICKR_API_SECRET", "API_SECRET"], &file.api_secret, "API Secret");
    let auth_token = pick(&["FLICKR_AUTH_TOKEN"], &file.auth_token, "Auth Token");

    sources.dedup();
    let source = if sources.is_empty() {
        "未找到".to_string()
    } else {
        sources.join(", ")
    };

    (
        Credentials {
            api_key,
            api_secret,
            auth_token: (!auth_token.is_empty()).then_some(auth_token),
        },
        source,
    )
}
