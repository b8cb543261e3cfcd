use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
///
/// 按失败的影响范围划分：
/// - `Config` / `SourceFetch`：作业级致命，批处理继续下一个作业
/// - `RevisionDetection`：学生级，调用方按修订版本 1 恢复
/// - `ContentExtraction` / `Grading`：学生级失败，台账不变
/// - `CachePersistence` / `ResultsExport`：仅记录日志，运行照常完成
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 无法列出或解析学生目录
    #[error("修订版本检测失败 ({path}): {source}")]
    RevisionDetection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 没有可评分的内容
    #[error("没有可评分的内容: {reason}")]
    ContentExtraction { reason: String },

    /// 评分服务错误
    #[error("评分服务错误: {0}")]
    Grading(#[from] GradingError),

    /// 提交来源获取失败
    #[error("获取提交失败 (作业 {assignment_id}): {message}")]
    SourceFetch {
        assignment_id: String,
        message: String,
    },

    /// 缓存快照写入失败
    #[error("缓存写入失败 ({path}): {message}")]
    CachePersistence { path: PathBuf, message: String },

    /// 评分结果导出失败
    #[error("评分结果导出失败 ({path}): {message}")]
    ResultsExport { path: PathBuf, message: String },

    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 作业配置缺少字段
    #[error("作业 {index} 缺少 {var_name}，ID、NAME、PROMPT 三项必须同时提供")]
    IncompleteAssignment { index: usize, var_name: String },

    /// 没有配置任何作业
    #[error("没有配置任何作业，请在 .env 中添加 ASSIGNMENT_1_ID、ASSIGNMENT_1_NAME 和 ASSIGNMENT_1_PROMPT")]
    NoAssignments,

    /// 评分标准标识未注册
    #[error("未知的评分标准: {0}")]
    UnknownRubric(String),

    /// 评分标准文本为空
    #[error("评分标准文本不能为空")]
    BlankRubric,

    /// 作业清单文件解析失败
    #[error("无法解析作业清单 {path}: {message}")]
    ManifestParseFailed { path: String, message: String },
}

/// 评分服务错误
#[derive(Debug, Error)]
pub enum GradingError {
    /// 未配置 API 密钥
    #[error("未配置 {var_name}")]
    MissingApiKey { var_name: String },

    /// API 调用失败
    #[error("评分 API 调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },

    /// 调用超时
    #[error("评分调用超时 (模型: {model}, 超时: {timeout:?})")]
    Timeout { model: String, timeout: Duration },

    /// 返回内容为空
    #[error("评分服务返回内容为空 (模型: {model})")]
    EmptyContent { model: String },

    /// 返回结果格式不正确
    #[error("评分结果格式不正确: {message}")]
    MalformedResponse { message: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建没有可评分内容的错误
    pub fn no_gradable_content() -> Self {
        AppError::ContentExtraction {
            reason: "no gradable content".to_string(),
        }
    }

    /// 创建提交来源获取失败错误
    pub fn source_fetch(assignment_id: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::SourceFetch {
            assignment_id: assignment_id.into(),
            message: message.into(),
        }
    }

    /// 创建缓存写入失败错误
    pub fn cache_persistence(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        AppError::CachePersistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// 创建结果导出失败错误
    pub fn results_export(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        AppError::ResultsExport {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// 是否为作业级致命错误
    pub fn is_assignment_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::SourceFetch { .. })
    }
}

impl GradingError {
    /// 创建格式错误
    pub fn malformed(message: impl Into<String>) -> Self {
        GradingError::MalformedResponse {
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
