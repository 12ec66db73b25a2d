// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use flickr_dl::{cli::Cli, error::AppError, run_from_cli, symbols};
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!(
                "\n{} {}，当前相册的进度可能未保存。",
                *symbols::WARN,
                AppError::UserInterrupt
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
            std::process::exit(130);
        }
    });

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "flickr-dl".to_string());

    let after_help = format!(
        "示例:\n  # 下载所有相册\n  {bin}\n\n  # 只下载名称以 Trip 开头的相册，校验失败时自动重试\n  {bin} -a \"Trip*\" -y\n\n  # 不下载视频，保存到指定目录\n  {bin} --no-video -o ~/Pictures/flickr\n\n  # 只对比远程相册与本地目录的文件数，生成 CSV 报告\n  {bin} --analyze\n\n凭据通过环境变量 FLICKR_API_KEY / FLICKR_API_SECRET 或 ~/.flickr-dl/config.json 提供。",
        bin = bin_name
    );

    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };

    match run_from_cli(args).await {
        Ok(summary) if summary.has_failures() => std::process::exit(1),
        Ok(_) => {}
        Err(e) => {
            log::error!("程序执行出错: {}", e);
            eprintln!("\n{} {}", *symbols::ERROR, format!("程序执行出错: {}", e).red());
            std::process::exit(1);
        }
    }
}
