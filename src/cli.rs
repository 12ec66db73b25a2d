// src/cli.rs

use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true,
)]
pub struct Cli {
    // --- 相册选择 (Albums) ---
    /// 只下载名称匹配该模式的相册，支持通配符 '*' 和 '?'
    #[arg(short, long, value_name = "PATTERN", help_heading = "Albums")]
    pub album: Option<String>,
    /// 同时处理名称以 'Auto Upload' 开头的相册
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Albums")]
    pub include_auto_upload: bool,

    // --- 下载选项 (Options) ---
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", help_heading = "Options")]
    pub output: Option<PathBuf>,
    /// 设置最大并发下载数
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 不下载视频
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub no_video: bool,
    /// 忽略 URL 缓存，重新解析所有项目的下载地址
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub refresh_urls: bool,

    // --- 校验与重试 (Verification) ---
    /// 校验失败时自动重试，不再询问
    #[arg(short, long, action = clap::ArgAction::SetTrue, conflicts_with = "no_retry", help_heading = "Verification")]
    pub yes: bool,
    /// 校验失败时不进行重试
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Verification")]
    pub no_retry: bool,
    /// 只对比远程相册与本地目录的文件数并输出 CSV 报告，不下载
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Verification")]
    pub analyze: bool,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true, hide = true)]
    pub log_level: LogLevel,
}
