// src/downloader/mod.rs

mod job;
mod negotiator;
mod resolver;
mod task_processor;
mod task_runner;
mod verifier;

pub use job::{AlbumDownloader, build_file_name, find_existing_file, remove_stale_temp_files};
pub use negotiator::{ItemNegotiator, select_best_asset};
pub use resolver::{OwnershipMap, choose_canonical};
pub use verifier::{CompletionVerifier, count_local_files, evaluate, expected_ids};

use crate::{models::AlbumReport, symbols, ui};
use colored::*;
use log::info;
use std::collections::HashMap;

/// 整次运行的统计，按相册处理顺序保存
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    reports: Vec<AlbumReport>,
}

impl RunSummary {
    pub fn record(&mut self, report: AlbumReport) {
        self.reports.push(report);
    }

    pub fn report_mut(&mut self, album: &str) -> Option<&mut AlbumReport> {
        self.reports.iter_mut().find(|r| r.album == album)
    }

    pub fn reports(&self) -> &[AlbumReport] {
        &self.reports
    }

    /// (已下载, 已跳过, 失败)
    pub fn totals(&self) -> (usize, usize, usize) {
        self.reports.iter().fold((0, 0, 0), |(d, s, f), r| {
            (d + r.downloaded, s + r.skipped, f + r.failed)
        })
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(AlbumReport::has_failures)
    }

    pub fn print_report(&self) {
        let (downloaded, skipped, failed) = self.totals();
        info!(
            "下载报告: Albums={}, Downloaded={}, Skipped={}, Failed={}",
            self.reports.len(),
            downloaded,
            skipped,
            failed
        );

        let (clean, with_failures): (Vec<&AlbumReport>, Vec<&AlbumReport>) =
            self.reports.iter().partition(|r| !r.has_failures());

        ui::print_header("下载总结");
        if !clean.is_empty() {
            println!("{} 成功完成的相册:", *symbols::OK);
            for r in &clean {
                println!(
                    "  - {}: 下载 {}, 跳过 {}",
                    r.album, r.downloaded, r.skipped
                );
            }
        }
        if !with_failures.is_empty() {
            println!("\n{} 存在失败的相册:", *symbols::ERROR);
            for r in &with_failures {
                let note = if r.verification_failed { " (校验未通过)" } else { "" };
                println!(
                    "  - {}: 下载 {}, 跳过 {}, {}{}",
                    r.album,
                    r.downloaded,
                    r.skipped,
                    format!("失败 {}", r.failed).red(),
                    note.yellow()
                );
                print_grouped_failures(&r.failures);
            }
        }

        ui::print_sub_header("总计");
        println!(
            "{} | {} | {}",
            format!("下载: {}", downloaded).green(),
            format!("跳过: {}", skipped).yellow(),
            format!("失败: {}", failed).red()
        );
        if self.has_failures() {
            ui::warn("部分文件下载失败，通常是临时网络问题，重新运行程序即可重试。");
        } else {
            println!("{} 所有下载均已完成，没有失败项。", *symbols::OK);
        }
    }
}

fn print_grouped_failures(items: &[(String, String)]) {
    let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, reason) in items {
        grouped.entry(reason.as_str()).or_default().push(name.as_str());
    }
    let mut reasons: Vec<_> = grouped.into_iter().collect();
    reasons.sort();
    for (reason, mut names) in reasons {
        println!("      {}", format!("原因: {}", reason).red());
        names.sort();
        for name in names {
            println!("        - {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals_and_failures() {
        let mut summary = RunSummary::default();
        let mut trip = AlbumReport::new("Trip");
        trip.downloaded = 3;
        trip.skipped = 1;
        summary.record(trip);

        let mut home = AlbumReport::new("Home");
        home.record_failure("a.jpg", "网络请求失败");
        summary.record(home);
        assert_eq!(summary.totals(), (3, 1, 1));
        assert!(summary.has_failures());

        let mut retry = AlbumReport::new("Home");
        retry.downloaded = 1;
        summary.report_mut("Home").unwrap().absorb(&retry);
        assert_eq!(summary.totals(), (4, 1, 0));
        assert!(!summary.has_failures());
    }
}
