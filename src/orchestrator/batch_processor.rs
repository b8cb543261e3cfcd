//! 批量作业处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量作业的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：按配置选择评分服务和提交来源
//! 2. **加载作业**：优先读取作业清单文件，否则读取环境变量
//! 3. **顺序处理**：逐个作业处理，单个作业失败不影响其他作业
//! 4. **资源管理**：台账和新鲜度缓存每次运行只加载一次
//! 5. **全局统计**：汇总已完成和跳过的作业，缓存在结束时保存一次

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::{self, Config};
use crate::infrastructure::{ArchiveFreshnessCache, GradingLedger};
use crate::models::{self, AssignmentConfig, AssignmentStatus};
use crate::orchestrator::assignment_processor::AssignmentProcessor;
use crate::services::{
    GradingService, HttpSubmissionSource, ManualUploadSource, OpenAiGrader, SubmissionSource,
};
use crate::utils::logging;

/// 批量评分器
pub struct BatchGrader {
    config: Config,
    processor: AssignmentProcessor,
}

impl BatchGrader {
    /// 按配置创建真实的评分服务和提交来源
    pub fn new(config: Config) -> Self {
        let grader: Arc<dyn GradingService> = Arc::new(OpenAiGrader::new(&config));

        let source: Arc<dyn SubmissionSource> = match &config.portal {
            Some(portal) => {
                info!("教学平台下载已配置: {}", portal.base_url);
                Arc::new(HttpSubmissionSource::new(
                    portal.clone(),
                    &config.submissions_root,
                ))
            }
            None => {
                info!("未配置教学平台，使用手动上传的提交");
                Arc::new(ManualUploadSource::new(&config.submissions_root))
            }
        };

        logging::log_startup(
            grader.model_name(),
            if config.portal.is_some() { "教学平台" } else { "手动上传" },
        );

        Self::with_services(config, source, grader)
    }

    /// 使用指定的协作方创建
    pub fn with_services(
        config: Config,
        source: Arc<dyn SubmissionSource>,
        grader: Arc<dyn GradingService>,
    ) -> Self {
        let processor = AssignmentProcessor::new(config.clone(), source, grader);
        Self { config, processor }
    }

    /// 运行主逻辑：加载作业并全部处理
    pub async fn run(&self) -> Result<Vec<AssignmentStatus>> {
        let assignments = self.load_assignments().await?;
        info!("✓ 已加载 {} 个作业", assignments.len());
        Ok(self.run_assignments(&assignments).await)
    }

    /// 处理给定的作业列表
    pub async fn run_assignments(&self, assignments: &[AssignmentConfig]) -> Vec<AssignmentStatus> {
        let start = Instant::now();

        let mut ledger = GradingLedger::load(self.config.ledger_path());
        let mut cache = ArchiveFreshnessCache::load(self.config.freshness_cache_path());
        info!("{}", ledger.summary());
        info!("{}", cache.summary());

        let mut statuses = Vec::with_capacity(assignments.len());
        let total = assignments.len();

        for (index, assignment) in assignments.iter().enumerate() {
            logging::log_assignment_start(index + 1, total, assignment);

            match self
                .processor
                .process(assignment, &mut ledger, &mut cache)
                .await
            {
                Ok(report) => {
                    info!("✓ 已完成: {}", assignment.name);
                    statuses.push(AssignmentStatus::Completed(report));
                }
                Err(e) => {
                    error!("✗ 已跳过: {} - {}", assignment.name, e);
                    statuses.push(AssignmentStatus::Skipped {
                        name: assignment.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = cache.persist() {
            error!("❌ 提交缓存保存失败: {}", e);
        }

        logging::print_run_summary(&statuses, start.elapsed());
        statuses
    }

    /// 加载作业配置
    ///
    /// 作业清单文件存在时使用清单，否则读取 `ASSIGNMENT_<n>_*` 环境变量
    async fn load_assignments(&self) -> Result<Vec<AssignmentConfig>> {
        let manifest = &self.config.assignments_file;
        if tokio::fs::try_exists(manifest).await.unwrap_or(false) {
            info!("\n📁 读取作业清单: {}", manifest.display());
            return models::load_assignment_manifest(manifest).await;
        }

        config::assignments_from_env().context("无法从环境变量加载作业配置")
    }
}
