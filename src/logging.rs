// src/logging.rs

use crate::cli::LogLevel;
use log::LevelFilter;
use std::{fs, path::Path};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// 初始化文件日志。失败时只打印警告，不影响下载。
pub fn init(level: LogLevel, log_file_path: &Path) {
    let filter = LevelFilter::from(level);
    if filter == LevelFilter::Off {
        return;
    }

    if let Some(dir) = log_file_path.parent()
        && !dir.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("警告: 无法打开日志文件 {:?}: {}。日志将不会被记录。", log_file_path, e);
            return;
        }
    };

    let result = fern::Dispatch::new()
        .level(filter)
        // 依赖库的调试输出过于冗长
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender)
        .apply();

    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}
