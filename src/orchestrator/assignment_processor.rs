//! 单个作业处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理单个作业的所有学生，是作业级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **解析评分标准**：未注册的标识直接让作业失败
//! 2. **定位提交**：按新鲜度缓存决定复用已解压目录还是重新获取
//! 3. **遍历学生**：创建并复用 `StudentFlow`，逐个学生顺序处理
//! 4. **保存台账**：作业结束时写一次，失败只记录日志
//! 5. **导出结果**：每个学生一行写入 CSV，失败只记录日志
//! 6. **统计输出**：记录评分/跳过/失败数量

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{export_assignment_results, ArchiveFreshnessCache, GradingLedger};
use crate::models::{AssignmentConfig, AssignmentReport, StudentReport};
use crate::services::{AssignmentPrompt, GradingService, RevisionResolver, SubmissionSource};
use crate::utils::logging;
use crate::workflow::{StudentCtx, StudentFlow};

/// 单个作业处理器
///
/// 持有本次运行的协作方，台账和缓存由调用方借出
pub struct AssignmentProcessor {
    config: Config,
    source: Arc<dyn SubmissionSource>,
    grader: Arc<dyn GradingService>,
}

impl AssignmentProcessor {
    pub fn new(
        config: Config,
        source: Arc<dyn SubmissionSource>,
        grader: Arc<dyn GradingService>,
    ) -> Self {
        Self {
            config,
            source,
            grader,
        }
    }

    /// 处理单个作业
    ///
    /// 返回错误表示整个作业被跳过（评分标准或提交获取失败）；
    /// 单个学生的失败记录在报告中，不会返回错误
    pub async fn process(
        &self,
        assignment: &AssignmentConfig,
        ledger: &mut GradingLedger,
        cache: &mut ArchiveFreshnessCache,
    ) -> AppResult<AssignmentReport> {
        let prompt = AssignmentPrompt::from_registry(&assignment.prompt)?;
        info!("→ 已加载评分标准: {}", assignment.prompt);

        let submissions_dir = self.locate_submissions(assignment, cache).await?;
        let resolver = RevisionResolver::new(&self.config.source_extension);
        let students = list_students(&resolver, &submissions_dir, &assignment.id)?;
        info!("→ 找到 {} 份学生提交", students.len());

        // 创建流程对象（只创建一次，复用）
        let flow = StudentFlow::new(&self.config, Arc::clone(&self.grader), prompt);
        let mut report = AssignmentReport::new(&assignment.id, &assignment.name);

        let total = students.len();
        for (index, student_dir) in students.into_iter().enumerate() {
            let ctx = StudentCtx::new(assignment, student_dir, index + 1, total);
            let outcome = flow.run(&ctx, ledger).await;
            report.push(StudentReport {
                student_key: ctx.student_key,
                student_id: ctx.student_id,
                outcome,
            });
        }

        if let Err(e) = ledger.persist() {
            error!("❌ 评分台账保存失败，本次进度将在下次运行时重新评分: {}", e);
        }

        match export_assignment_results(&self.config.results_dir, &report) {
            Ok(exported) => info!("→ 结果已保存到: {}", exported.dir.display()),
            Err(e) => error!("❌ {}", e),
        }

        logging::log_assignment_complete(&report);
        Ok(report)
    }

    /// 定位作业的提交目录
    ///
    /// 远端标记与缓存一致且缓存目录仍存在时复用，否则重新获取并更新缓存
    async fn locate_submissions(
        &self,
        assignment: &AssignmentConfig,
        cache: &mut ArchiveFreshnessCache,
    ) -> AppResult<PathBuf> {
        let remote_token = self.source.freshness_token(assignment).await;

        if !cache.needs_refresh(&assignment.id, remote_token.as_deref()) {
            match cache.cached_path(&assignment.id) {
                Some(path) if path.is_dir() => {
                    info!("⊘ 提交未更新，使用缓存目录: {}", path.display());
                    return Ok(path.to_path_buf());
                }
                _ => warn!("⚠ 缓存记录存在但目录已不存在，重新获取"),
            }
        }

        info!("→ 获取最新提交: {}", assignment.name);
        let dir = self.source.fetch_and_extract(assignment).await?;
        cache.commit(&assignment.id, &assignment.name, remote_token.as_deref(), &dir);
        Ok(dir)
    }
}

/// 列出学生目录，提交目录为空视为作业级错误
fn list_students(
    resolver: &RevisionResolver,
    submissions_dir: &Path,
    assignment_id: &str,
) -> AppResult<Vec<PathBuf>> {
    let students = resolver.list_students(submissions_dir).map_err(|e| {
        AppError::source_fetch(
            assignment_id,
            format!("无法读取提交目录 {}: {}", submissions_dir.display(), e),
        )
    })?;

    if students.is_empty() {
        return Err(AppError::source_fetch(
            assignment_id,
            format!("提交目录为空: {}", submissions_dir.display()),
        ));
    }
    Ok(students)
}
