// src/downloader/task_processor.rs

use crate::{RunContext, constants, error::*, models::*, utils};
use futures::StreamExt;
use log::{debug, error, info};
use reqwest::header;
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// `TaskProcessor` 负责单个文件的下载，只返回结果，不修改任何共享状态。
pub struct TaskProcessor {
    context: RunContext,
}

impl TaskProcessor {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    pub async fn process(&self, task: FetchTask) -> FetchResult {
        let outcome = match self.download(&task).await {
            Ok(path) => FetchOutcome::Saved(path),
            Err(e) => {
                error!("下载 '{:?}' 失败: {}", task.filepath, e);
                FetchOutcome::Failed {
                    filepath: task.filepath.clone(),
                    kind: FailureKind::from(&e),
                    message: e.to_string(),
                }
            }
        };
        FetchResult {
            item_id: task.item_id,
            outcome,
        }
    }

    /// 流式写入同目录下的临时文件，完成后按实际 Content-Type 修正扩展名并落盘
    async fn download(&self, task: &FetchTask) -> AppResult<PathBuf> {
        let dir = task
            .filepath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;

        let res = self.context.http_client.get(&task.url).await?;

        let final_path = match res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            Some(content_type) => {
                let ext = utils::extension_from_content_type(content_type, task.kind);
                let corrected = task.filepath.with_extension(ext);
                if corrected != task.filepath {
                    info!(
                        "根据 Content-Type '{}' 将 '{:?}' 重命名为 '{:?}'",
                        content_type,
                        task.filepath.file_name(),
                        corrected.file_name()
                    );
                }
                corrected
            }
            None => task.filepath.clone(),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(constants::TEMP_FILE_PREFIX)
            .tempfile_in(&dir)?;
        {
            let mut writer = BufWriter::with_capacity(constants::CHUNK_SIZE, tmp.as_file_mut());
            let mut stream = res.bytes_stream();
            while let Some(chunk) = stream.next().await {
                writer.write_all(&chunk?)?;
            }
            writer.flush()?;
        }
        tmp.persist(&final_path)?;

        debug!("文件已写入: {:?}", final_path);
        Ok(final_path)
    }
}
