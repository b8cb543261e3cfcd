//! 评分结果导出
//!
//! 每个作业每次运行写一个结果目录 `<results_dir>/<作业名>-<时间戳>/`：
//! - `grades-<时间戳>.csv`：每个学生一行（评分、失败、跳过都有记录）
//! - `schoology-grades-<时间戳>.csv`：成绩导入表，只含本次评分和失败的学生

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{sanitize_name, AssignmentReport, StudentOutcome, StudentReport};

const GRADES_HEADER: [&str; 10] = [
    "FolderName",
    "Score",
    "MVP",
    "Stretch1",
    "Stretch2",
    "Stretch3",
    "CompileIssues",
    "Feedback",
    "Revision",
    "Status",
];

/// 导出的文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedResults {
    pub dir: PathBuf,
    pub grades: PathBuf,
    /// 没有评分或失败的学生时不生成导入表
    pub import_sheet: Option<PathBuf>,
}

/// 按当前本地时间导出
pub fn export_assignment_results(
    results_dir: &Path,
    report: &AssignmentReport,
) -> AppResult<ExportedResults> {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    export_with_timestamp(results_dir, report, &timestamp)
}

pub fn export_with_timestamp(
    results_dir: &Path,
    report: &AssignmentReport,
    timestamp: &str,
) -> AppResult<ExportedResults> {
    let dir = results_dir.join(format!(
        "{}-{}",
        sanitize_name(&report.assignment_name),
        timestamp
    ));
    fs::create_dir_all(&dir).map_err(|e| AppError::results_export(&dir, e))?;

    let grades = dir.join(format!("grades-{}.csv", timestamp));
    write_grades(&grades, &report.students)?;
    info!("📄 评分结果已写入: {}", grades.display());

    let import_rows: Vec<[String; 2]> = report.students.iter().filter_map(import_row).collect();
    let import_sheet = if import_rows.is_empty() {
        None
    } else {
        let path = dir.join(format!("schoology-grades-{}.csv", timestamp));
        write_import_sheet(&path, &report.assignment_name, &import_rows)?;
        info!("📄 成绩导入表已写入: {}", path.display());
        Some(path)
    };

    Ok(ExportedResults {
        dir,
        grades,
        import_sheet,
    })
}

fn write_grades(path: &Path, students: &[StudentReport]) -> AppResult<()> {
    let mut writer = open_writer(path)?;
    writer
        .write_record(GRADES_HEADER)
        .map_err(|e| AppError::results_export(path, e))?;
    for student in students {
        writer
            .write_record(grade_row(student))
            .map_err(|e| AppError::results_export(path, e))?;
    }
    writer.flush().map_err(|e| AppError::results_export(path, e))
}

fn write_import_sheet(path: &Path, column: &str, rows: &[[String; 2]]) -> AppResult<()> {
    let column = single_line(column);
    let mut writer = open_writer(path)?;
    writer
        .write_record(["Unique User ID", column.as_str()])
        .map_err(|e| AppError::results_export(path, e))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::results_export(path, e))?;
    }
    writer.flush().map_err(|e| AppError::results_export(path, e))
}

fn open_writer(path: &Path) -> AppResult<csv::Writer<File>> {
    csv::Writer::from_path(path).map_err(|e| AppError::results_export(path, e))
}

fn grade_row(student: &StudentReport) -> [String; 10] {
    let key = single_line(&student.student_key);
    match &student.outcome {
        StudentOutcome::Graded {
            revision,
            result,
            feedback,
        } => [
            key,
            format!("{:.1}/{:.0}", result.score, result.max_score),
            result.mvp_complete.to_string(),
            result.completed_stretch("stretch1").to_string(),
            result.completed_stretch("stretch2").to_string(),
            result.completed_stretch("stretch3").to_string(),
            result.compile_issues.to_string(),
            single_line(feedback),
            revision.to_string(),
            "graded".to_string(),
        ],
        StudentOutcome::Failed { revision, reason } => [
            key,
            "0/10".to_string(),
            "false".to_string(),
            "false".to_string(),
            "false".to_string(),
            "false".to_string(),
            "error".to_string(),
            single_line(reason),
            revision.to_string(),
            "failed".to_string(),
        ],
        StudentOutcome::Skipped {
            revision,
            last_graded_revision,
        } => [
            key,
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format!("revision {} already graded", last_graded_revision),
            revision.to_string(),
            "skipped".to_string(),
        ],
    }
}

/// 跳过的学生沿用平台上已有的成绩，不写入导入表
fn import_row(student: &StudentReport) -> Option<[String; 2]> {
    let score = match &student.outcome {
        StudentOutcome::Graded { result, .. } => format_import_score(result.score),
        StudentOutcome::Failed { .. } => "0".to_string(),
        StudentOutcome::Skipped { .. } => return None,
    };
    Some([single_line(&student.student_id), score])
}

/// 整数分不带小数，其余保留一位
pub fn format_import_score(score: f64) -> String {
    if !score.is_finite() {
        return "0".to_string();
    }
    if (score - score.round()).abs() < 1e-9 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
