use crate::error::ConfigError;
use crate::models::assignment::AssignmentConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// `assignments.toml` 的文件结构
///
/// ```toml
/// [[assignment]]
/// id = "8017693698"
/// name = "Multiply"
/// prompt = "MultiplyPrompt"
/// ```
#[derive(Debug, Deserialize)]
struct AssignmentManifest {
    #[serde(default, rename = "assignment")]
    assignments: Vec<AssignmentConfig>,
}

/// 解析作业清单文本
pub fn parse_assignment_manifest(content: &str, source: &str) -> Result<Vec<AssignmentConfig>, ConfigError> {
    let manifest: AssignmentManifest =
        toml::from_str(content).map_err(|e| ConfigError::ManifestParseFailed {
            path: source.to_string(),
            message: e.to_string(),
        })?;

    for (idx, assignment) in manifest.assignments.iter().enumerate() {
        assignment.validate(idx + 1)?;
    }

    if manifest.assignments.is_empty() {
        return Err(ConfigError::NoAssignments);
    }

    Ok(manifest
        .assignments
        .into_iter()
        .map(|a| AssignmentConfig {
            id: a.id.trim().to_string(),
            name: a.name.trim().to_string(),
            prompt: a.prompt.trim().to_string(),
        })
        .collect())
}

/// 从 TOML 文件加载作业清单
pub async fn load_assignment_manifest(path: &Path) -> Result<Vec<AssignmentConfig>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取作业清单: {}", path.display()))?;

    let assignments = parse_assignment_manifest(&content, &path.display().to_string())?;
    tracing::info!(
        "从 {} 加载了 {} 个作业",
        path.file_name().unwrap_or_default().to_string_lossy(),
        assignments.len()
    );

    Ok(assignments)
}
