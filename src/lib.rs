// src/lib.rs

pub mod analysis;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod models;
pub mod remote;
pub mod state;
pub mod symbols;
pub mod ui;
pub mod utils;
pub mod workflows;

use crate::{
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    error::AppResult,
    remote::{PhotoService, flickr::FlickrService, rate_limit::RateLimitedCaller},
};
use log::{debug, info};
use std::sync::Arc;

/// 一次运行中所有组件共享的只读上下文
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<AppConfig>,
    pub service: Arc<dyn PhotoService>,
    pub http_client: Arc<RobustClient>,
}

impl RunContext {
    pub fn new(config: Arc<AppConfig>, service: Arc<dyn PhotoService>) -> AppResult<Self> {
        let http_client = Arc::new(RobustClient::new(&config)?);
        Ok(Self {
            config,
            service,
            http_client,
        })
    }
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<downloader::RunSummary> {
    let config = AppConfig::new(&args)?;
    logging::init(args.log_level, &config.log_file());
    debug!("CLI 参数: {:?}", args);

    // 凭据缺失时不发起任何远程调用
    config.validate()?;
    info!("从 {} 加载 API 凭据", config.credentials_source);
    ui::info(&format!("已从 {} 加载 API 凭据。", config.credentials_source));

    let config = Arc::new(config);
    let caller = Arc::new(RateLimitedCaller::new(
        config.retry_policy.clone(),
        config.api_call_delay,
    ));
    let service: Arc<dyn PhotoService> = Arc::new(FlickrService::new(&config, caller)?);
    let context = RunContext::new(config, service)?;

    if args.analyze {
        analysis::run(&context).await?;
        return Ok(downloader::RunSummary::default());
    }
    workflows::run(&context).await
}
