//! 处理结果模型
//!
//! 学生状态机：`PENDING → {SKIPPED, GRADED, FAILED}`，终态不可再变。
//! 每个学生在一次运行中只产生一个 `StudentOutcome`。

use std::fmt;

use crate::models::grading::GradingResult;

/// 单个学生的最终状态
#[derive(Debug, Clone, PartialEq)]
pub enum StudentOutcome {
    /// 当前修订版本不高于已评分版本，未调用评分服务
    Skipped {
        revision: u32,
        last_graded_revision: u32,
    },
    /// 评分成功并已推进台账
    Graded {
        revision: u32,
        result: GradingResult,
        /// 面向学生的一行反馈
        feedback: String,
    },
    /// 失败，台账未改动，下次运行会重试
    Failed { revision: u32, reason: String },
}

impl StudentOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StudentOutcome::Skipped { .. })
    }

    pub fn is_graded(&self) -> bool {
        matches!(self, StudentOutcome::Graded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StudentOutcome::Failed { .. })
    }
}

impl fmt::Display for StudentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentOutcome::Skipped {
                revision,
                last_graded_revision,
            } => write!(
                f,
                "跳过 (修订 {} 已评分, 台账记录: 修订 {})",
                revision, last_graded_revision
            ),
            StudentOutcome::Graded {
                revision, result, ..
            } => write!(
                f,
                "已评分 (修订 {}): {:.1}/{:.0}",
                revision, result.score, result.max_score
            ),
            StudentOutcome::Failed { revision, reason } => {
                write!(f, "失败 (修订 {}): {}", revision, reason)
            }
        }
    }
}

/// 单个学生的处理记录
#[derive(Debug, Clone, PartialEq)]
pub struct StudentReport {
    /// 提交目录名
    pub student_key: String,
    /// 台账中的学生 ID
    pub student_id: String,
    pub outcome: StudentOutcome,
}

/// 单个作业的处理汇总
#[derive(Debug, Clone, Default)]
pub struct AssignmentReport {
    pub assignment_id: String,
    pub assignment_name: String,
    pub students: Vec<StudentReport>,
}

impl AssignmentReport {
    pub fn new(assignment_id: impl Into<String>, assignment_name: impl Into<String>) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            assignment_name: assignment_name.into(),
            students: Vec::new(),
        }
    }

    pub fn push(&mut self, report: StudentReport) {
        self.students.push(report);
    }

    pub fn total(&self) -> usize {
        self.students.len()
    }

    pub fn skipped(&self) -> usize {
        self.students.iter().filter(|s| s.outcome.is_skipped()).count()
    }

    pub fn graded(&self) -> usize {
        self.students.iter().filter(|s| s.outcome.is_graded()).count()
    }

    pub fn failed(&self) -> usize {
        self.students.iter().filter(|s| s.outcome.is_failed()).count()
    }

    /// 失败学生及原因
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.students.iter().filter_map(|s| match &s.outcome {
            StudentOutcome::Failed { reason, .. } => Some((s.student_key.as_str(), reason.as_str())),
            _ => None,
        })
    }

    /// 查找指定学生的记录
    pub fn find(&self, student_key: &str) -> Option<&StudentReport> {
        self.students.iter().find(|s| s.student_key == student_key)
    }
}

/// 作业级结果（批量模式）
#[derive(Debug, Clone)]
pub enum AssignmentStatus {
    Completed(AssignmentReport),
    /// 配置或获取提交失败，整个作业被跳过
    Skipped { name: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(key: &str, outcome: StudentOutcome) -> StudentReport {
        StudentReport {
            student_key: key.to_string(),
            student_id: key.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let mut summary = AssignmentReport::new("A1", "Multiply");
        summary.push(report(
            "s1",
            StudentOutcome::Skipped {
                revision: 2,
                last_graded_revision: 2,
            },
        ));
        summary.push(report(
            "s2",
            StudentOutcome::Graded {
                revision: 1,
                result: GradingResult::from_response(
                    r#"{"score": 9, "maxScore": 10, "mvpComplete": true, "feedback": {}}"#,
                )
                .unwrap(),
                feedback: String::new(),
            },
        ));
        summary.push(report(
            "s3",
            StudentOutcome::Failed {
                revision: 3,
                reason: "no gradable content".to_string(),
            },
        ));

        assert_eq!(summary.total(), 3);
        assert_eq!((summary.skipped(), summary.graded(), summary.failed()), (1, 1, 1));
        let failures: Vec<_> = summary.failures().collect();
        assert_eq!(failures, vec![("s3", "no gradable content")]);
        assert!(summary.find("s2").unwrap().outcome.is_graded());
    }
}
