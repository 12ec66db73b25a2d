// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const FILENAME_TRUNCATE_LENGTH: usize = 65;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const PROGRESS_FILE_NAME: &str = "progress.json";
pub const URL_CACHE_FILE_NAME: &str = "url_cache.json";
pub const ANALYSIS_FILE_STEM: &str = "flickr_album_analysis";
pub const DEFAULT_DOWNLOAD_DIR: &str = "flickr_downloads";
pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_API_CALL_DELAY_SECS: f64 = 1.1;
pub const USER_AGENT: &str = concat!(clap::crate_name!(), "/", clap::crate_version!());

/// 始终排除的自动上传相册名称
pub const AUTO_UPLOAD_ALBUM: &str = "Auto Upload";
/// 过滤无匹配时最多列出的相册数量
pub const MAX_LISTED_ALBUMS: usize = 20;
/// 写入文件时使用的流式块大小
pub const CHUNK_SIZE: usize = 8192;
/// 下载和状态写入使用的临时文件前缀，中断后残留的同名文件会在下次运行时清理
pub const TEMP_FILE_PREFIX: &str = concat!(".", clap::crate_name!(), "-");

pub mod network {
    pub const API_TIMEOUT_SECS: u64 = 120;
    pub const FETCH_TIMEOUT_SECS: u64 = 180;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const INITIAL_BACKOFF_SECS: u64 = 2;
    pub const MAX_BACKOFF_SECS: u64 = 60;
    pub const FETCH_MAX_RETRIES: u32 = 2;
    /// 调用间隔与退避时间的上限，超出的配置值会被截断
    pub const MAX_DELAY_SECS: u64 = 3600;
}

pub mod api {
    pub const REST_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
    pub const PER_PAGE: &str = "500";

    pub mod methods {
        pub const TEST_LOGIN: &str = "flickr.test.login";
        pub const PHOTOSETS_GET_LIST: &str = "flickr.photosets.getList";
        pub const PHOTOSETS_GET_INFO: &str = "flickr.photosets.getInfo";
        pub const PHOTOSETS_GET_PHOTOS: &str = "flickr.photosets.getPhotos";
        pub const PHOTOS_GET_INFO: &str = "flickr.photos.getInfo";
        pub const PHOTOS_GET_SIZES: &str = "flickr.photos.getSizes";
    }

    /// 表示服务繁忙或被限流的错误代码
    pub const BUSY_CODES: &[i64] = &[105, 429, 503];
}

pub mod extensions {
    pub const DEFAULT_PHOTO: &str = "jpg";
    pub const DEFAULT_VIDEO: &str = "mp4";
    pub const IMAGE: &[&str] = &["jpg", "jpeg", "png", "gif"];
    pub const VIDEO: &[&str] = &["mp4", "mov", "avi", "webm", "mkv", "flv", "wmv"];
}
