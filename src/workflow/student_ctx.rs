//! 学生处理上下文
//!
//! 封装"我正在处理哪个作业的哪个学生"这一信息

use std::fmt::Display;
use std::path::PathBuf;

use crate::models::AssignmentConfig;

/// 学生处理上下文
#[derive(Debug, Clone)]
pub struct StudentCtx {
    /// 作业 ID（台账键）
    pub assignment_id: String,

    /// 作业名称（台账中的作业标签）
    pub assignment_name: String,

    /// 提交文件夹名，同时作为显示名
    pub student_key: String,

    /// 台账中的学生 ID
    pub student_id: String,

    /// 学生提交目录
    pub student_dir: PathBuf,

    /// 学生序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本作业学生总数
    pub total: usize,
}

impl StudentCtx {
    pub fn new(assignment: &AssignmentConfig, student_dir: PathBuf, index: usize, total: usize) -> Self {
        let student_key = student_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| student_dir.display().to_string());

        Self {
            assignment_id: assignment.id.clone(),
            assignment_name: assignment.name.clone(),
            student_id: student_id_from_key(&student_key),
            student_key,
            student_dir,
            index,
            total,
        }
    }
}

impl Display for StudentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[学生 {}/{} {}]", self.index, self.total, self.student_key)
    }
}

/// 从文件夹名提取学生 ID
///
/// 取最后一个 `-` 之后的部分，例如 `"Castro, Marianna - s486002"` → `"s486002"`；
/// 没有 `-` 时使用整个名称
pub fn student_id_from_key(student_key: &str) -> String {
    let id = match student_key.rsplit_once('-') {
        Some((_, tail)) if !tail.trim().is_empty() => tail,
        _ => student_key,
    };
    id.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id_from_key() {
        assert_eq!(student_id_from_key("Castro, Marianna - s486002"), "s486002");
        assert_eq!(student_id_from_key("Tyryk, Roman-Avdii - s513390"), "s513390");
        assert_eq!(student_id_from_key("s1001"), "s1001");
        assert_eq!(student_id_from_key("trailing -"), "trailing -");
    }

    #[test]
    fn test_ctx_from_directory() {
        let assignment = AssignmentConfig::new("A1", "Multiply", "MultiplyPrompt").unwrap();
        let ctx = StudentCtx::new(
            &assignment,
            PathBuf::from("submissions/Multiply/Doe, Jane - s1001"),
            2,
            5,
        );

        assert_eq!(ctx.student_id, "s1001");
        assert_eq!(ctx.student_key, "Doe, Jane - s1001");
        assert_eq!(ctx.to_string(), "[学生 2/5 Doe, Jane - s1001]");
    }
}
