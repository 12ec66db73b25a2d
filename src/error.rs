// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("未配置 API 凭据 (需要 API Key 和 API Secret)")]
    CredentialsMissing,
    #[error("配置无效: {0}")]
    Config(String),
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("无法解析来自 '{method}' 的API响应: {source}")]
    ApiParseFailed {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Flickr API 错误 (代码 {code}): {message}")]
    Api { code: i64, message: String },
    #[error("远程调用 '{method}' 在 {attempts} 次尝试后仍然失败: {last}")]
    RetriesExhausted {
        method: String,
        attempts: u32,
        last: String,
    },
    #[error("用户中断")]
    UserInterrupt,
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
