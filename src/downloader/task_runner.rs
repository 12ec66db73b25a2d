// src/downloader/task_runner.rs

use super::task_processor::TaskProcessor;
use crate::{RunContext, constants, models::*, symbols, ui, utils};
use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use log::error;
use std::cmp::min;

/// 以有限并发执行一批下载任务，按完成顺序返回全部结果。
pub async fn execute_tasks(context: &RunContext, tasks: Vec<FetchTask>, label: &str) -> Vec<FetchResult> {
    let max_workers = min(context.config.max_workers, tasks.len());
    if max_workers == 0 {
        return Vec::new();
    }

    ui::info(&format!(
        "开始下载 {} 个文件 (并发数: {})...",
        tasks.len(),
        max_workers
    ));
    let pbar = ui::new_tasks_progress_bar(tasks.len() as u64, label);

    let results: Vec<FetchResult> = stream::iter(tasks)
        .map(|task| run_isolated(context.clone(), task))
        .buffer_unordered(max_workers)
        .inspect(|result| {
            pbar.inc(1);
            report_single_result(&pbar, result);
        })
        .collect()
        .await;

    pbar.finish_and_clear();
    results
}

/// 在独立的 tokio 任务中运行，任务 panic 时转换为带标记的失败结果
async fn run_isolated(context: RunContext, task: FetchTask) -> FetchResult {
    let item_id = task.item_id.clone();
    let filepath = task.filepath.clone();
    let handle = tokio::spawn(async move { TaskProcessor::new(context).process(task).await });
    match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            error!("下载任务 {} 异常终止: {}", item_id, join_error);
            FetchResult {
                item_id,
                outcome: FetchOutcome::Failed {
                    filepath,
                    kind: FailureKind::UnexpectedError,
                    message: join_error.to_string(),
                },
            }
        }
    }
}

fn report_single_result(pbar: &ProgressBar, result: &FetchResult) {
    match &result.outcome {
        FetchOutcome::Saved(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| result.item_id.clone());
            pbar.println(format!(
                "{} {}",
                *symbols::OK,
                utils::truncate_text(&name, constants::FILENAME_TRUNCATE_LENGTH)
            ));
        }
        FetchOutcome::Failed {
            filepath,
            kind,
            message,
        } => {
            let (symbol, color_fn, default_msg) = kind.get_display_info();
            let name = filepath
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| result.item_id.clone());
            pbar.println(format!(
                "{} {} {}",
                symbol,
                utils::truncate_text(&name, constants::FILENAME_TRUNCATE_LENGTH),
                color_fn(format!("失败: {} (详情: {})", default_msg, message).into())
            ));
        }
    }
}
