//! 学生处理流程 - 流程层
//!
//! 核心职责：定义"一个学生"的完整处理流程
//!
//! 流程顺序：
//! 1. 解析当前修订版本（失败按 1 处理）
//! 2. 与台账比较，不高于已评分版本则跳过
//! 3. 选出最新内容，为空则失败
//! 4. 调用评分服务，成功后推进台账

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, GradingError};
use crate::infrastructure::GradingLedger;
use crate::models::StudentOutcome;
use crate::services::{AssignmentPrompt, GradingService, RevisionResolver};
use crate::utils::logging::truncate_text;
use crate::workflow::student_ctx::StudentCtx;

/// 学生处理流程
///
/// - 每个作业创建一次，所有学生复用
/// - 不持有台账，由调用方逐个学生借出
/// - 任何错误都转成 `Failed`，不会中断调用方的循环
pub struct StudentFlow {
    resolver: RevisionResolver,
    grader: Arc<dyn GradingService>,
    prompt: AssignmentPrompt,
    grading_timeout: Duration,
    verbose_logging: bool,
}

impl StudentFlow {
    pub fn new(config: &Config, grader: Arc<dyn GradingService>, prompt: AssignmentPrompt) -> Self {
        Self {
            resolver: RevisionResolver::new(&config.source_extension),
            grader,
            prompt,
            grading_timeout: config.grading_timeout(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(&self, ctx: &StudentCtx, ledger: &mut GradingLedger) -> StudentOutcome {
        // ========== 1. 当前修订版本 ==========
        let revision = match self.resolver.resolve_current_revision(&ctx.student_dir) {
            Ok(revision) => revision,
            Err(e) => {
                warn!("{} ⚠️ {}，按修订 1 处理", ctx, e);
                1
            }
        };

        // ========== 2. 与台账比较 ==========
        let last_graded = ledger.last_graded_revision(&ctx.student_id, &ctx.assignment_id);
        if revision <= last_graded {
            info!(
                "{} ⊘ 跳过: 修订 {} 已评分 (台账: 修订 {})",
                ctx, revision, last_graded
            );
            return StudentOutcome::Skipped {
                revision,
                last_graded_revision: last_graded,
            };
        }

        if last_graded > 0 {
            info!("{} 🔄 发现新修订: {} → {}", ctx, last_graded, revision);
        } else {
            info!("{} 🆕 首次评分 (修订 {})", ctx, revision);
        }

        // ========== 3. 选出最新内容 ==========
        let content = match self.resolver.select_latest_content(&ctx.student_dir) {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                let reason = AppError::no_gradable_content().to_string();
                warn!("{} ⚠️ {}", ctx, reason);
                return StudentOutcome::Failed { revision, reason };
            }
            Err(e) => {
                warn!("{} ⚠️ {}", ctx, e);
                return StudentOutcome::Failed {
                    revision,
                    reason: e.to_string(),
                };
            }
        };

        if self.verbose_logging {
            debug!("{} 提交内容: {}", ctx, truncate_text(&content, 200));
        }

        // ========== 4. 评分 ==========
        let prompt = self.prompt.build_prompt(&content);
        let graded = tokio::time::timeout(
            self.grading_timeout,
            self.grader.grade(&ctx.student_key, &prompt),
        )
        .await
        .unwrap_or_else(|_| {
            Err(GradingError::Timeout {
                model: self.grader.model_name().to_string(),
                timeout: self.grading_timeout,
            })
        });

        match graded {
            Ok(result) => {
                ledger.record_grade(
                    &ctx.student_id,
                    &ctx.student_key,
                    &ctx.assignment_id,
                    &ctx.assignment_name,
                    revision,
                    result.score,
                );
                let feedback = result.feedback_summary();
                info!(
                    "{} ✓ 已评分 (修订 {}): {:.1}/{:.0}",
                    ctx, revision, result.score, result.max_score
                );
                info!(
                    "{}   MVP: {} | 拓展目标: {:?} | 编译问题: {}",
                    ctx, result.mvp_complete, result.stretch_goals_completed, result.compile_issues
                );
                info!("{}   {}", ctx, truncate_text(&feedback, 120));

                StudentOutcome::Graded {
                    revision,
                    result,
                    feedback,
                }
            }
            Err(e) => {
                let reason = AppError::from(e).to_string();
                error!("{} ❌ {}", ctx, reason);
                StudentOutcome::Failed { revision, reason }
            }
        }
    }
}
