//! 评分台账
//!
//! 记录每个 (学生, 作业) 最后一次评分的修订版本和分数，保证同一修订版本
//! 最多只调用一次付费评分。
//!
//! 快照结构：
//!
//! ```json
//! {
//!   "students": {
//!     "s513390": {
//!       "name": "Tyryk, Roman - s513390",
//!       "assignments": {
//!         "8017693698": {
//!           "assignment_name": "Constants Variables Datatypes",
//!           "last_graded_revision": 2,
//!           "grade": 10.0,
//!           "graded_timestamp": "2025-10-11T15:30:00Z"
//!         }
//!       }
//!     }
//!   },
//!   "cache_version": "1.0",
//!   "last_updated": "2025-10-11T15:30:00Z"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::snapshot::{self, CACHE_VERSION};
use crate::error::AppResult;

/// 单个作业的评分记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(default)]
    pub assignment_name: String,
    #[serde(default)]
    pub last_graded_revision: u32,
    #[serde(default)]
    pub grade: f64,
    #[serde(default = "Utc::now")]
    pub graded_timestamp: DateTime<Utc>,
}

/// 单个学生的全部评分记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub assignments: BTreeMap<String, LedgerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default)]
    students: BTreeMap<String, StudentRecord>,
    #[serde(default = "default_version")]
    cache_version: String,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

impl Default for LedgerData {
    fn default() -> Self {
        Self {
            students: BTreeMap::new(),
            cache_version: default_version(),
            last_updated: Utc::now(),
        }
    }
}

fn default_version() -> String {
    CACHE_VERSION.to_string()
}

/// 评分台账
///
/// 单调性由调用方保证：只在评分成功、且修订版本高于台账记录时调用
/// [`GradingLedger::record_grade`]
#[derive(Debug)]
pub struct GradingLedger {
    path: PathBuf,
    data: LedgerData,
}

impl GradingLedger {
    /// 加载台账；文件缺失或损坏时从空台账开始
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match snapshot::load_snapshot::<LedgerData>(&path, "评分台账") {
            Some(data) => {
                info!("✓ 已加载评分台账: 跟踪 {} 名学生", data.students.len());
                data
            }
            None => LedgerData::default(),
        };
        Self { path, data }
    }

    /// 最后一次评分的修订版本，从未评分返回 0
    pub fn last_graded_revision(&self, student_id: &str, assignment_id: &str) -> u32 {
        self.entry(student_id, assignment_id)
            .map(|entry| entry.last_graded_revision)
            .unwrap_or(0)
    }

    /// 该修订版本（或更高版本）是否已经评过分
    pub fn is_already_graded(&self, student_id: &str, assignment_id: &str, revision: u32) -> bool {
        self.last_graded_revision(student_id, assignment_id) >= revision
    }

    pub fn entry(&self, student_id: &str, assignment_id: &str) -> Option<&LedgerEntry> {
        self.data
            .students
            .get(student_id)
            .and_then(|student| student.assignments.get(assignment_id))
    }

    pub fn student(&self, student_id: &str) -> Option<&StudentRecord> {
        self.data.students.get(student_id)
    }

    /// 评分成功后写入记录（不存在则创建）
    pub fn record_grade(
        &mut self,
        student_id: &str,
        display_name: &str,
        assignment_id: &str,
        assignment_label: &str,
        revision: u32,
        grade: f64,
    ) {
        let student = self.data.students.entry(student_id.to_string()).or_default();
        student.display_name = display_name.to_string();

        let entry = student
            .assignments
            .entry(assignment_id.to_string())
            .or_insert_with(|| LedgerEntry {
                assignment_name: String::new(),
                last_graded_revision: 0,
                grade: 0.0,
                graded_timestamp: Utc::now(),
            });
        entry.assignment_name = assignment_label.to_string();
        entry.last_graded_revision = revision;
        entry.grade = grade;
        entry.graded_timestamp = Utc::now();

        debug!("  → 台账已更新: {} 修订 {}", student_id, revision);
    }

    /// 写出完整快照
    pub fn persist(&mut self) -> AppResult<()> {
        self.data.last_updated = Utc::now();
        snapshot::persist_snapshot(&self.path, &self.data)?;
        info!("✓ 评分台账已保存到 {}", self.path.display());
        Ok(())
    }

    pub fn student_count(&self) -> usize {
        self.data.students.len()
    }

    pub fn graded_count(&self) -> usize {
        self.data
            .students
            .values()
            .map(|student| student.assignments.len())
            .sum()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.data.last_updated
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn summary(&self) -> String {
        format!(
            "台账: {} 名学生, {} 条作业评分记录",
            self.student_count(),
            self.graded_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ledger_in(dir: &TempDir) -> GradingLedger {
        GradingLedger::load(dir.path().join("grading-cache.json"))
    }

    #[test]
    fn test_never_graded_is_zero_then_first_grade() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);

        assert_eq!(ledger.last_graded_revision("s1001", "A1"), 0);
        assert!(!ledger.is_already_graded("s1001", "A1", 1));

        ledger.record_grade("s1001", "Doe, Jane - s1001", "A1", "Multiply", 1, 8.5);
        assert_eq!(ledger.last_graded_revision("s1001", "A1"), 1);
        assert!(ledger.is_already_graded("s1001", "A1", 1));
        assert!(!ledger.is_already_graded("s1001", "A1", 2));
        // 其他作业不受影响
        assert_eq!(ledger.last_graded_revision("s1001", "A2"), 0);
    }

    #[test]
    fn test_increasing_revisions_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);

        for (revision, grade) in [(1, 6.0), (2, 7.5), (5, 9.0)] {
            ledger.record_grade("s1", "s1", "A1", "Buttons", revision, grade);
        }

        let entry = ledger.entry("s1", "A1").unwrap();
        assert_eq!(entry.last_graded_revision, 5);
        assert_eq!(entry.grade, 9.0);
        assert_eq!(ledger.graded_count(), 1);
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.record_grade("s1", "Doe, Jane - s1", "A1", "Multiply", 2, 10.0);
        ledger.record_grade("s1", "Doe, Jane - s1", "A2", "Buttons", 1, 7.0);
        ledger.record_grade("s2", "Roe, Rick - s2", "A1", "Multiply", 3, 4.5);
        ledger.persist().unwrap();

        let reloaded = ledger_in(&dir);
        assert_eq!(reloaded.student_count(), 2);
        assert_eq!(reloaded.graded_count(), 3);
        for (sid, aid, revision, grade) in [("s1", "A1", 2, 10.0), ("s1", "A2", 1, 7.0), ("s2", "A1", 3, 4.5)] {
            let entry = reloaded.entry(sid, aid).unwrap();
            assert_eq!((entry.last_graded_revision, entry.grade), (revision, grade));
        }
        assert_eq!(reloaded.student("s2").unwrap().display_name, "Roe, Rick - s2");
    }

    #[test]
    fn test_reads_existing_snapshot_and_ignores_unknown_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("grading-cache.json"),
            r#"{
              "students": {
                "s513390": {
                  "name": "Roman-Avdii Tyryk",
                  "nickname": "Roman",
                  "assignments": {
                    "8017693698": {
                      "assignment_name": "Constants Variables Datatypes",
                      "last_graded_revision": 2,
                      "grade": 10.0,
                      "graded_timestamp": "2025-10-11T15:30:00.123456Z",
                      "reviewer": "ta"
                    }
                  }
                }
              },
              "cache_version": "1.0",
              "last_updated": "2025-10-11T15:30:00Z",
              "schema_hint": 3
            }"#,
        )
        .unwrap();

        let ledger = ledger_in(&dir);
        assert_eq!(ledger.last_graded_revision("s513390", "8017693698"), 2);
        assert_eq!(ledger.student("s513390").unwrap().display_name, "Roman-Avdii Tyryk");
    }

    #[test]
    fn test_corrupt_snapshot_starts_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("grading-cache.json"), "{\"students\": [1, 2").unwrap();

        let ledger = ledger_in(&dir);
        assert_eq!(ledger.student_count(), 0);
        assert_eq!(ledger.summary(), "台账: 0 名学生, 0 条作业评分记录");
    }
}
