use serde::Deserialize;

use crate::error::ConfigError;

/// 单个作业的配置
///
/// 来自 `.env` 中的 `ASSIGNMENT_<n>_*` 变量，或 `assignments.toml` 清单
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssignmentConfig {
    /// 远端作业 ID
    pub id: String,
    /// 作业名称（同时作为台账中的作业标签）
    pub name: String,
    /// 评分标准标识，在 `services::rubric_registry` 中解析
    pub prompt: String,
}

impl AssignmentConfig {
    /// 创建作业配置，三个字段都不能为空
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            prompt: prompt.into().trim().to_string(),
        };
        config.validate(0)?;
        Ok(config)
    }

    /// 校验字段完整性，`index` 仅用于错误信息
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let missing = |field: &str| ConfigError::IncompleteAssignment {
            index,
            var_name: format!("ASSIGNMENT_{}_{}", index, field),
        };

        if self.id.trim().is_empty() {
            return Err(missing("ID"));
        }
        if self.name.trim().is_empty() {
            return Err(missing("NAME"));
        }
        if self.prompt.trim().is_empty() {
            return Err(missing("PROMPT"));
        }
        Ok(())
    }

    /// 用于目录名的作业名称
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }
}

impl std::fmt::Display for AssignmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Assignment[id={}, name={}, prompt={}]",
            self.id, self.name, self.prompt
        )
    }
}

/// 空白替换为下划线，去掉 `[A-Za-z0-9_-]` 以外的字符
pub fn sanitize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
