//! # Submission Grader
//!
//! 按修订版本增量评分的学生作业批处理程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持久化状态，只暴露读写能力
//! - `GradingLedger` - 评分台账：每个学生每个作业最后评分的修订版本
//! - `ArchiveFreshnessCache` - 提交缓存：远端新鲜度标记与本地解压目录
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个学生或单个作业
//! - `RevisionResolver` - 识别修订版本、合并源码
//! - `GradingService` - 调用大模型评分
//! - `SubmissionSource` - 获取并解压提交
//! - `rubric_registry` - 评分标准注册表
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学生"的完整处理流程
//! - `StudentCtx` - 上下文封装（作业 + 学生目录）
//! - `StudentFlow` - 流程编排（修订版本 → 台账判断 → 合并源码 → 评分 → 记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量作业处理器，管理台账和缓存
//! - `orchestrator/assignment_processor` - 单个作业处理器，遍历学生列表

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError, GradingError};
pub use infrastructure::{ArchiveFreshnessCache, GradingLedger};
pub use models::{AssignmentConfig, AssignmentReport, AssignmentStatus, StudentOutcome};
pub use orchestrator::{AssignmentProcessor, BatchGrader};
pub use services::{GradingService, RevisionResolver, SubmissionSource};
pub use workflow::{StudentCtx, StudentFlow};
