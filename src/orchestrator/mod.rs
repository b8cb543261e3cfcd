//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量作业处理器
//! - 选择评分服务和提交来源
//! - 加载作业配置（Vec<AssignmentConfig>）
//! - 持有台账和新鲜度缓存，整次运行只加载、保存一次
//! - 输出全局统计信息
//!
//! ### `assignment_processor` - 单个作业处理器
//! - 解析评分标准、定位提交目录
//! - 遍历作业的所有学生（Vec<PathBuf>）
//! - 创建并复用 StudentFlow
//! - 输出单个作业的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<AssignmentConfig>)
//!     ↓
//! assignment_processor (处理 Vec<学生目录>)
//!     ↓
//! workflow::StudentFlow (处理单个学生)
//!     ↓
//! services (能力层：修订解析 / 评分 / 提交来源)
//!     ↓
//! infrastructure (基础设施：台账 / 新鲜度缓存)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，assignment_processor 管单个作业
//! 2. **顺序执行**：学生逐个处理，不并发
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **故障隔离**：学生失败不影响作业，作业失败不影响批量

pub mod assignment_processor;
pub mod batch_processor;

// 重新导出主要类型
pub use assignment_processor::AssignmentProcessor;
pub use batch_processor::BatchGrader;
