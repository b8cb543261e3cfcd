//! 修订版本解析
//!
//! 学生目录下可能有多个候选（`Revision N - On time` 之类的文件夹、zip 压缩包、
//! 直接放置的源文件）。本模块负责两件事：
//! - 从文件夹名中找出当前修订版本号
//! - 按修改时间从新到旧挑出第一个有内容的候选，把其中的源文件合并成一段文本

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 修订文件夹命名：`Revision <n> - <状态>`，状态文字只作参考
fn revision_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^Revision\s+(\d+)\s+-\s+\S.*$").ok())
        .as_ref()
}

/// 从文件夹名中解析修订版本号，不是修订文件夹返回 0
///
/// ```
/// use submission_grader::services::parse_revision_number;
///
/// assert_eq!(parse_revision_number("Revision 3 - Late"), 3);
/// assert_eq!(parse_revision_number("Notes"), 0);
/// ```
pub fn parse_revision_number(folder_name: &str) -> u32 {
    let Some(captures) = revision_pattern().and_then(|re| re.captures(folder_name.trim())) else {
        return 0;
    };
    match captures[1].parse() {
        Ok(revision) => revision,
        Err(_) => {
            warn!("⚠ 修订版本号无法解析: {}", folder_name);
            0
        }
    }
}

/// 修订版本解析器
#[derive(Debug, Clone)]
pub struct RevisionResolver {
    /// 源文件后缀，如 `.swift`
    suffix: String,
}

impl RevisionResolver {
    pub fn new(extension: &str) -> Self {
        Self {
            suffix: format!(".{}", extension.trim_start_matches('.')),
        }
    }

    /// 当前修订版本：直接子目录中最大的修订号，没有修订文件夹时为 1
    pub fn resolve_current_revision(&self, student_dir: &Path) -> AppResult<u32> {
        let max_revision = list_dir(student_dir)
            .map_err(|source| AppError::RevisionDetection {
                path: student_dir.to_path_buf(),
                source,
            })?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .map(|name| parse_revision_number(&name))
            .max()
            .unwrap_or(0);

        Ok(max_revision.max(1))
    }

    /// 选出最新的有效提交内容，找不到源文件时返回空字符串
    pub fn select_latest_content(&self, student_dir: &Path) -> AppResult<String> {
        let candidates = self.list_candidates(student_dir).map_err(|e| {
            AppError::ContentExtraction {
                reason: format!("无法读取学生目录 {}: {}", student_dir.display(), e),
            }
        })?;

        for candidate in &candidates {
            match self.merge_candidate(candidate) {
                Ok(merged) if !merged.is_empty() => {
                    debug!("使用候选: {}", candidate.display());
                    return Ok(merged);
                }
                Ok(_) => debug!("候选没有源文件: {}", candidate.display()),
                Err(e) => warn!("⚠ 读取候选失败 {}: {}", candidate.display(), e),
            }
        }

        // 没有修订文件夹或压缩包时，合并整个学生目录
        let mut merged = String::new();
        self.merge_directory(student_dir, student_dir, &mut merged)
            .map_err(|e| AppError::ContentExtraction {
                reason: format!("读取 {} 失败: {}", student_dir.display(), e),
            })?;
        Ok(merged.trim().to_string())
    }

    /// 读取指定修订版本文件夹的内容，不存在时返回空字符串
    pub fn read_specific_revision(&self, student_dir: &Path, revision: u32) -> AppResult<String> {
        let folders = list_dir(student_dir).map_err(|source| AppError::RevisionDetection {
            path: student_dir.to_path_buf(),
            source,
        })?;

        let folder = folders.into_iter().filter(|p| p.is_dir()).find(|p| {
            p.file_name()
                .map(|n| parse_revision_number(&n.to_string_lossy()) == revision)
                .unwrap_or(false)
        });

        let Some(folder) = folder else {
            warn!("⚠ 未找到修订 {}: {}", revision, student_dir.display());
            return Ok(String::new());
        };

        let mut merged = String::new();
        self.merge_directory(&folder, &folder, &mut merged)?;
        Ok(merged.trim().to_string())
    }

    /// 提交根目录下的学生文件夹（按名称排序）
    pub fn list_students(&self, submissions_root: &Path) -> AppResult<Vec<PathBuf>> {
        Ok(list_dir(submissions_root)?
            .into_iter()
            .filter(|path| path.is_dir())
            .collect())
    }

    /// 直接子目录和压缩包，按修改时间从新到旧；时间相同时按名称
    fn list_candidates(&self, student_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut candidates: Vec<(SystemTime, PathBuf)> = list_dir(student_dir)?
            .into_iter()
            .filter(|path| path.is_dir() || is_zip(path))
            .map(|path| (modified_time(&path), path))
            .collect();

        // list_dir 已按名称排序，稳定排序保留同一时间内的名称顺序
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(candidates.into_iter().map(|(_, path)| path).collect())
    }

    fn merge_candidate(&self, candidate: &Path) -> io::Result<String> {
        let mut merged = String::new();
        if candidate.is_dir() {
            self.merge_directory(candidate, candidate, &mut merged)?;
        } else {
            self.merge_zip(candidate, &mut merged)?;
        }
        Ok(merged.trim().to_string())
    }

    fn merge_directory(&self, dir: &Path, label_base: &Path, out: &mut String) -> io::Result<()> {
        for child in list_dir(dir)? {
            if child.is_dir() {
                self.merge_directory(&child, label_base, out)?;
            } else if self.is_source(&child) {
                let bytes = fs::read(&child)?;
                let label = child.strip_prefix(label_base).unwrap_or(&child);
                append_file(out, &label.to_string_lossy(), &String::from_utf8_lossy(&bytes));
            } else if is_zip(&child) {
                self.merge_zip(&child, out)?;
            }
        }
        Ok(())
    }

    fn merge_zip(&self, zip_path: &Path, out: &mut String) -> io::Result<()> {
        let mut archive = zip::ZipArchive::new(File::open(zip_path)?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if entry.is_dir() || !entry.name().ends_with(&self.suffix) {
                continue;
            }

            let label = entry_label(entry.name());
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            append_file(out, &label, &String::from_utf8_lossy(&bytes));
        }
        Ok(())
    }

    fn is_source(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(&self.suffix))
                .unwrap_or(false)
    }
}

fn list_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn modified_time(path: &Path) -> SystemTime {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(e) => {
            warn!("⚠ 无法读取修改时间 {}: {}", path.display(), e);
            SystemTime::UNIX_EPOCH
        }
    }
}

fn is_zip(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with(".zip"))
            .unwrap_or(false)
}

/// 压缩包条目保留包内相对路径，同名文件才能区分
fn entry_label(entry_name: &str) -> String {
    entry_name
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn append_file(out: &mut String, label: &str, content: &str) {
    out.push_str("// File: ");
    out.push_str(label);
    out.push('\n');
    out.push_str(content);
    out.push_str("\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch);
        File::open(path).unwrap().set_modified(time).unwrap();
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_parse_revision_number() {
        assert_eq!(parse_revision_number("Revision 3 - Late"), 3);
        assert_eq!(parse_revision_number("Revision 12 - On time"), 12);
        assert_eq!(parse_revision_number("revision 4 - late"), 4);
        assert_eq!(parse_revision_number("Notes"), 0);
        assert_eq!(parse_revision_number("Revision - Late"), 0);
        assert_eq!(parse_revision_number("Revision 99999999999 - Late"), 0);
    }

    #[test]
    fn test_resolve_without_revision_folders_is_one() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Notes")).unwrap();
        // 文件名像修订文件夹也不算
        write(&dir.path().join("Revision 5 - Late"), "not a folder");

        let resolver = RevisionResolver::new("swift");
        assert_eq!(resolver.resolve_current_revision(dir.path()).unwrap(), 1);
    }

    #[test]
    fn test_resolve_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let resolver = RevisionResolver::new("swift");
        let err = resolver
            .resolve_current_revision(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, AppError::RevisionDetection { .. }));
    }

    #[test]
    fn test_newest_revision_with_content_wins() {
        let dir = TempDir::new().unwrap();
        let student = dir.path();
        let rev1 = student.join("Revision 1 - On time");
        let rev2 = student.join("Revision 2 - Late");
        fs::create_dir_all(&rev1).unwrap();
        write(&rev2.join("Main.swift"), "print(\"rev2\")");
        set_mtime(&rev1, 1_000);
        set_mtime(&rev2, 2_000);

        let resolver = RevisionResolver::new("swift");
        assert_eq!(resolver.resolve_current_revision(student).unwrap(), 2);
        assert_eq!(
            resolver.select_latest_content(student).unwrap(),
            "// File: Main.swift\nprint(\"rev2\")"
        );
    }

    #[test]
    fn test_empty_newer_candidate_falls_through() {
        let dir = TempDir::new().unwrap();
        let student = dir.path();
        let rev1 = student.join("Revision 1 - On time");
        let rev2 = student.join("Revision 2 - Late");
        write(&rev1.join("App").join("ContentView.swift"), "struct ContentView {}");
        write(&rev2.join("README.md"), "nothing to grade");
        set_mtime(&rev1, 1_000);
        set_mtime(&rev2, 2_000);

        let resolver = RevisionResolver::new("swift");
        let content = resolver.select_latest_content(student).unwrap();
        let expected_label = Path::new("App").join("ContentView.swift");
        assert_eq!(
            content,
            format!("// File: {}\nstruct ContentView {{}}", expected_label.display())
        );
    }

    #[test]
    fn test_zip_candidates_and_nested_zips() {
        let dir = TempDir::new().unwrap();
        let student = dir.path();

        write_zip(
            &student.join("submission.ZIP"),
            &[
                ("Project/Sources/Main.swift", "let a = 1"),
                ("Project/Package.resolved", "{}"),
                ("Project/Sources/", ""),
            ],
        );
        set_mtime(&student.join("submission.ZIP"), 3_000);

        let older = student.join("Revision 1 - On time");
        fs::create_dir_all(&older).unwrap();
        write_zip(&older.join("inner.zip"), &[("Other.swift", "let b = 2")]);
        set_mtime(&older, 1_000);

        let resolver = RevisionResolver::new("swift");
        assert_eq!(
            resolver.select_latest_content(student).unwrap(),
            "// File: Project/Sources/Main.swift\nlet a = 1"
        );

        // 直接读取修订文件夹时会展开其中的压缩包
        assert_eq!(
            resolver.read_specific_revision(student, 1).unwrap(),
            "// File: Other.swift\nlet b = 2"
        );
        assert_eq!(resolver.read_specific_revision(student, 7).unwrap(), "");
    }

    #[test]
    fn test_zip_entries_keep_relative_paths() {
        let dir = TempDir::new().unwrap();
        write_zip(
            &dir.path().join("app.zip"),
            &[
                ("App/Views/ContentView.swift", "struct A {}"),
                ("App/Stretch/ContentView.swift", "struct B {}"),
            ],
        );

        let merged = RevisionResolver::new("swift")
            .select_latest_content(dir.path())
            .unwrap();
        assert!(merged.contains("// File: App/Views/ContentView.swift\nstruct A {}"));
        assert!(merged.contains("// File: App/Stretch/ContentView.swift\nstruct B {}"));
        assert_eq!(entry_label("./App\\Views//Main.swift"), "App/Views/Main.swift");
    }

    #[test]
    fn test_fallback_to_loose_files_and_blank_result() {
        let dir = TempDir::new().unwrap();
        let student = dir.path();
        write(&student.join("b.swift"), "let b = 2");
        write(&student.join("a.swift"), "let a = 1");

        let resolver = RevisionResolver::new(".swift");
        assert_eq!(
            resolver.select_latest_content(student).unwrap(),
            "// File: a.swift\nlet a = 1\n\n// File: b.swift\nlet b = 2"
        );

        let empty = TempDir::new().unwrap();
        write(&empty.path().join("notes.txt"), "hello");
        assert_eq!(resolver.select_latest_content(empty.path()).unwrap(), "");
    }

    #[test]
    fn test_list_students_only_directories() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("Doe, Jane - s1002")).unwrap();
        fs::create_dir(root.path().join("Abe, Sam - s1001")).unwrap();
        write(&root.path().join("manifest.txt"), "x");

        let resolver = RevisionResolver::new("swift");
        let students = resolver.list_students(root.path()).unwrap();
        let names: Vec<_> = students
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Abe, Sam - s1001", "Doe, Jane - s1002"]);
    }
}
