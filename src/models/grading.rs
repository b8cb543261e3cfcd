use serde::{Deserialize, Serialize};

use crate::error::GradingError;

/// 编译问题等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileIssues {
    None,
    Minor,
    Major,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CompileIssues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CompileIssues::None => "none",
            CompileIssues::Minor => "minor",
            CompileIssues::Major => "major",
            CompileIssues::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// 评分反馈
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingFeedback {
    #[serde(default)]
    pub student_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub syntax_errors: Vec<String>,
}

/// 评分服务返回的结构化结果
///
/// `score`、`maxScore`、`mvpComplete`、`feedback` 缺一即视为格式错误；
/// 未知字段忽略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: f64,
    pub max_score: f64,
    pub mvp_complete: bool,
    #[serde(default)]
    pub stretch_goals_completed: Vec<String>,
    pub feedback: GradingFeedback,
    #[serde(default)]
    pub compile_issues: CompileIssues,
}

impl GradingResult {
    /// 从模型返回的文本中解析评分结果
    ///
    /// 允许外层包裹 markdown 代码块（```json ... ```）
    pub fn from_response(content: &str) -> Result<Self, GradingError> {
        let json = strip_code_fence(content);
        if json.is_empty() {
            return Err(GradingError::malformed("响应为空"));
        }

        let result: GradingResult =
            serde_json::from_str(json).map_err(|e| GradingError::malformed(e.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    fn validate(&self) -> Result<(), GradingError> {
        if !self.score.is_finite() || !self.max_score.is_finite() {
            return Err(GradingError::malformed("分数不是有效数字"));
        }
        if self.max_score <= 0.0 {
            return Err(GradingError::malformed(format!(
                "满分必须大于 0 (maxScore={})",
                self.max_score
            )));
        }
        if self.score < 0.0 {
            return Err(GradingError::malformed(format!(
                "分数不能为负 (score={})",
                self.score
            )));
        }
        Ok(())
    }

    /// 是否完成了指定的拓展目标（如 `stretch1`）
    pub fn completed_stretch(&self, tag: &str) -> bool {
        self.stretch_goals_completed.iter().any(|t| t == tag)
    }

    /// 生成一行面向学生的反馈
    ///
    /// 优先使用 `studentSummary`；否则由优点、改进项、语法问题拼成最多三句话
    pub fn feedback_summary(&self) -> String {
        let summary = normalize_summary(&self.feedback.student_summary);
        if !summary.is_empty() {
            return summary;
        }

        let mut sentences = Vec::new();

        let strengths = summarize_list(&self.feedback.strengths);
        if !strengths.is_empty() {
            sentences.push(ensure_period(&format!("You nailed: {}", strengths)));
        }

        let improvements = summarize_list(&self.feedback.improvements);
        if !improvements.is_empty() {
            sentences.push(ensure_period(&format!(
                "To raise your score next time, focus on: {}",
                improvements
            )));
        }

        let syntax = summarize_list(&self.feedback.syntax_errors);
        if !syntax.is_empty() {
            sentences.push(ensure_period(&format!(
                "Fix syntax issues such as: {}",
                syntax
            )));
        }

        if sentences.is_empty() {
            return "Keep going, you are close! Please review the rubric for any missing requirements."
                .to_string();
        }

        sentences.join(" ")
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 跳过语言标记所在的行
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn summarize_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join("; ")
}

fn normalize_summary(summary: &str) -> String {
    let cleaned = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    ensure_period(&cleaned)
}

fn ensure_period(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_student_summary_when_present() {
        let result = GradingResult::from_response(
            r#"{
              "score": 9.5,
              "maxScore": 10,
              "mvpComplete": true,
              "stretchGoalsCompleted": ["stretch1"],
              "feedback": {
                "studentSummary": "Great progress on the MVP layout.   Add the console logging to lock in the remaining points",
                "strengths": ["MVP layout is correct"],
                "improvements": ["Add console logging"],
                "syntaxErrors": []
              },
              "compileIssues": "none"
            }"#,
        )
        .unwrap();

        assert_eq!(
            result.feedback_summary(),
            "Great progress on the MVP layout. Add the console logging to lock in the remaining points."
        );
        assert!(result.completed_stretch("stretch1"));
        assert!(!result.completed_stretch("stretch2"));
        assert_eq!(result.compile_issues, CompileIssues::None);
    }

    #[test]
    fn test_falls_back_to_structured_sentences() {
        let result = GradingResult::from_response(
            r#"{
              "score": 6.0,
              "maxScore": 10,
              "mvpComplete": false,
              "stretchGoalsCompleted": [],
              "feedback": {
                "strengths": ["Button layout matches the mockup"],
                "improvements": ["Add console logs", "Implement the counter stretch goal"],
                "syntaxErrors": ["Close the VStack brace"]
              },
              "compileIssues": "minor"
            }"#,
        )
        .unwrap();

        assert_eq!(
            result.feedback_summary(),
            "You nailed: Button layout matches the mockup. To raise your score next time, focus on: Add console logs; Implement the counter stretch goal. Fix syntax issues such as: Close the VStack brace."
        );
    }

    #[test]
    fn test_code_fence_and_unknown_compile_level() {
        let content = "```json\n{\"score\": 8, \"maxScore\": 10, \"mvpComplete\": true, \"feedback\": {}, \"compileIssues\": \"catastrophic\", \"extra\": 1}\n```";
        let result = GradingResult::from_response(content).unwrap();
        assert_eq!(result.score, 8.0);
        assert_eq!(result.compile_issues, CompileIssues::Unknown);
        assert!(result.feedback_summary().starts_with("Keep going"));
    }

    #[test]
    fn test_incomplete_response_is_malformed() {
        // 缺少 feedback
        let err = GradingResult::from_response(r#"{"score": 8, "maxScore": 10, "mvpComplete": true}"#)
            .unwrap_err();
        assert!(matches!(err, GradingError::MalformedResponse { .. }));

        assert!(GradingResult::from_response("I think this deserves an 8/10").is_err());
        assert!(GradingResult::from_response("").is_err());
        assert!(GradingResult::from_response(
            r#"{"score": 8, "maxScore": 0, "mvpComplete": true, "feedback": {}}"#
        )
        .is_err());
    }
}
