//! 提交来源
//!
//! 负责"拿到一个每个学生一个子目录的提交目录"，以及提供用于新鲜度判断的
//! 远端标记。两种实现：
//! - [`ManualUploadSource`]：老师手动把提交放到 `<submissions_root>/<作业名>`
//! - [`HttpSubmissionSource`]：从教学平台下载整包 zip 并解压

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::models::AssignmentConfig;
use crate::services::revision_resolver::parse_revision_number;

/// 提交来源
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    /// 远端新鲜度标记，无法获取时返回 `None`
    async fn freshness_token(&self, assignment: &AssignmentConfig) -> Option<String>;

    /// 获取并解压提交，返回提交目录
    async fn fetch_and_extract(&self, assignment: &AssignmentConfig) -> AppResult<PathBuf>;
}

/// 手动上传的提交
#[derive(Debug, Clone)]
pub struct ManualUploadSource {
    submissions_root: PathBuf,
}

impl ManualUploadSource {
    pub fn new(submissions_root: impl Into<PathBuf>) -> Self {
        Self {
            submissions_root: submissions_root.into(),
        }
    }
}

#[async_trait]
impl SubmissionSource for ManualUploadSource {
    async fn freshness_token(&self, _assignment: &AssignmentConfig) -> Option<String> {
        None
    }

    async fn fetch_and_extract(&self, assignment: &AssignmentConfig) -> AppResult<PathBuf> {
        let dir = self.submissions_root.join(assignment.sanitized_name());
        if !dir.is_dir() {
            return Err(AppError::source_fetch(
                &assignment.id,
                format!("提交目录不存在: {}", dir.display()),
            ));
        }
        debug!("使用手动上传的提交: {}", dir.display());
        Ok(dir)
    }
}

/// 从教学平台下载的提交
pub struct HttpSubmissionSource {
    client: reqwest::Client,
    portal: PortalConfig,
    submissions_root: PathBuf,
}

impl HttpSubmissionSource {
    pub fn new(portal: PortalConfig, submissions_root: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!("⚠ HTTP 客户端配置失败，使用默认配置: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            portal,
            submissions_root: submissions_root.into(),
        }
    }

    fn download_url(&self, assignment_id: &str) -> String {
        format!(
            "{}/assignment/{}/dropbox/download_all",
            self.portal.base_url, assignment_id
        )
    }

    /// 带会话和 CSRF 头的请求
    fn request(&self, method: Method, assignment_id: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.download_url(assignment_id))
            .header("Cookie", &self.portal.session_cookie)
            .header("accept", "*/*")
            .header(
                "referer",
                format!("{}/assignment/{}/info", self.portal.base_url, assignment_id),
            );
        if let Some(key) = &self.portal.csrf_key {
            builder = builder.header("x-csrf-key", key);
        }
        if let Some(token) = &self.portal.csrf_token {
            builder = builder.header("x-csrf-token", token);
        }
        builder
    }
}

#[async_trait]
impl SubmissionSource for HttpSubmissionSource {
    async fn freshness_token(&self, assignment: &AssignmentConfig) -> Option<String> {
        let response = match self.request(Method::HEAD, &assignment.id).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠ 无法查询远端更新时间: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("⚠ 查询远端更新时间失败: HTTP {}", response.status());
            return None;
        }

        let token = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        debug!("远端 Last-Modified: {:?}", token);
        token
    }

    async fn fetch_and_extract(&self, assignment: &AssignmentConfig) -> AppResult<PathBuf> {
        info!("📥 下载作业提交: {} (ID: {})", assignment.name, assignment.id);

        let response = self
            .request(Method::GET, &assignment.id)
            .send()
            .await
            .map_err(|e| AppError::source_fetch(&assignment.id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::source_fetch(
                &assignment.id,
                download_failure_message(status, &assignment.id),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("zip") && !content_type.contains("octet-stream") {
            warn!("⚠ 非预期的 Content-Type: {}，按 zip 处理", content_type);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::source_fetch(&assignment.id, e.to_string()))?;
        info!("✓ 已下载 {} KB", bytes.len() / 1024);

        let target = self.submissions_root.join(assignment.sanitized_name());
        let extract_target = target.clone();
        let file_count = tokio::task::spawn_blocking(move || extract_archive(&bytes, &extract_target))
            .await
            .map_err(|e| AppError::source_fetch(&assignment.id, e.to_string()))?
            .map_err(|e| AppError::source_fetch(&assignment.id, format!("解压失败: {}", e)))?;

        info!("✓ 已解压 {} 个文件到 {}", file_count, target.display());
        Ok(target)
    }
}

fn download_failure_message(status: StatusCode, assignment_id: &str) -> String {
    match status {
        StatusCode::UNAUTHORIZED => {
            "认证失败，会话 Cookie 可能已过期，请更新 .session-cookie 文件".to_string()
        }
        StatusCode::FORBIDDEN => "访问被拒绝，CSRF 令牌可能已失效，请从浏览器重新获取".to_string(),
        StatusCode::NOT_FOUND => format!("作业不存在 (ID: {})，请确认作业 ID", assignment_id),
        other => format!("下载失败: HTTP {}", other),
    }
}

/// 把 zip 数据解压到 `target`，替换原有内容，返回解压的文件数
///
/// 只有一个顶层包装文件夹（不是学生文件夹）时展开该文件夹。路径穿越的条目和 macOS 元数据被忽略。
pub fn extract_archive(data: &[u8], target: &Path) -> io::Result<usize> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let staging_name = format!(
        ".{}.extracting",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let staging = parent.join(staging_name);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let file_count = match unpack(data, &staging) {
        Ok(count) => count,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    let root = single_root_folder(&staging)?.unwrap_or_else(|| staging.clone());

    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    fs::rename(&root, target)?;
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }

    Ok(file_count)
}

fn unpack(data: &[u8], dest: &Path) -> io::Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut file_count = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("⚠ 忽略不安全的压缩包路径: {}", entry.name());
            continue;
        };
        if is_metadata(&relative) {
            continue;
        }

        let out_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        file_count += 1;
    }

    Ok(file_count)
}

fn is_metadata(relative: &Path) -> bool {
    relative.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name == "__MACOSX" || name == ".DS_Store"
    })
}

/// 平台导出时可能多包一层文件夹；只有确定它不是学生文件夹时才展开
fn single_root_folder(dir: &Path) -> io::Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    match entries.as_slice() {
        [only] if only.is_dir() && is_export_wrapper(only)? => Ok(Some(only.clone())),
        _ => Ok(None),
    }
}

fn is_export_wrapper(folder: &Path) -> io::Result<bool> {
    let mut child_names = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        // 学生文件夹里才会直接出现文件（源码、压缩包）
        if !path.is_dir() {
            return Ok(false);
        }
        child_names.push(file_name_of(&path));
    }

    if child_names.iter().any(|name| parse_revision_number(name) > 0) {
        return Ok(false);
    }
    if child_names.iter().any(|name| looks_like_student_key(name)) {
        return Ok(true);
    }
    Ok(!looks_like_student_key(&file_name_of(folder)))
}

/// `姓, 名 - 学号` 形式：最后一个 `-` 两侧都非空，学号不含空白
fn looks_like_student_key(name: &str) -> bool {
    match name.rsplit_once('-') {
        Some((head, tail)) => {
            let tail = tail.trim();
            !head.trim().is_empty() && !tail.is_empty() && !tail.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
