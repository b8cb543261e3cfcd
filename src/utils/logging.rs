//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::{AssignmentConfig, AssignmentReport, AssignmentStatus};

/// 初始化日志
///
/// 默认级别 `info`，可用 `RUST_LOG` 覆盖；`verbose` 为真时默认级别改为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(model: &str, source: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评分模式");
    info!("🤖 评分模型: {}", model);
    info!("📥 提交来源: {}", source);
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录作业开始信息
pub fn log_assignment_start(index: usize, total: usize, assignment: &AssignmentConfig) {
    info!("\n{}", "=".repeat(60));
    info!("📦 处理第 {}/{} 个作业: {}", index, total, assignment.name);
    info!("  ID: {}", assignment.id);
    info!("  评分标准: {}", assignment.prompt);
    info!("{}", "=".repeat(60));
}

/// 记录单个作业的处理结果
pub fn log_assignment_complete(report: &AssignmentReport) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ {} 完成: 评分 {}, 跳过 {}, 失败 {}, 共 {}",
        report.assignment_name,
        report.graded(),
        report.skipped(),
        report.failed(),
        report.total()
    );
    for (student_key, reason) in report.failures() {
        warn!("  ✗ {} - {}", student_key, reason);
    }
    info!("{}", "─".repeat(60));
}

/// 打印批量运行汇总
pub fn print_run_summary(statuses: &[AssignmentStatus], elapsed: Duration) {
    let completed: Vec<&AssignmentReport> = statuses
        .iter()
        .filter_map(|status| match status {
            AssignmentStatus::Completed(report) => Some(report),
            AssignmentStatus::Skipped { .. } => None,
        })
        .collect();
    let skipped: Vec<(&str, &str)> = statuses
        .iter()
        .filter_map(|status| match status {
            AssignmentStatus::Skipped { name, error } => Some((name.as_str(), error.as_str())),
            AssignmentStatus::Completed(_) => None,
        })
        .collect();

    let (minutes, seconds) = split_elapsed(elapsed);

    info!("\n{}", "=".repeat(60));
    info!("📊 批量评分汇总");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("作业总数: {}", statuses.len());
    info!("✅ 已完成: {}", completed.len());
    info!("⏭  已跳过 (错误): {}", skipped.len());
    info!("⏱  总耗时: {}m {}s", minutes, seconds);

    if !completed.is_empty() {
        info!("\n已完成的作业:");
        for report in &completed {
            info!(
                "  ✓ {} (评分 {}, 跳过 {}, 失败 {})",
                report.assignment_name,
                report.graded(),
                report.skipped(),
                report.failed()
            );
        }
    }

    if !skipped.is_empty() {
        info!("\n跳过的作业:");
        for (name, error) in &skipped {
            info!("  ✗ {} - {}", name, error);
        }
    }

    info!("{}", "=".repeat(60));
}

/// 拆分耗时为分钟和秒
pub fn split_elapsed(elapsed: Duration) -> (u64, u64) {
    let total = elapsed.as_secs();
    (total / 60, total % 60)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
