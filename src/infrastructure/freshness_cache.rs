//! 提交包新鲜度缓存
//!
//! 按作业记录远端 `Last-Modified` 标记和上次解压的位置。只有远端标记与
//! 缓存标记完全相同时才复用已解压的目录，否则重新下载。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::snapshot::{self, CACHE_VERSION};
use crate::error::AppResult;

/// 单个作业的下载记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveCacheEntry {
    #[serde(default)]
    pub assignment_name: String,
    /// 远端新鲜度标记，可能为空
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default = "Utc::now")]
    pub last_downloaded: DateTime<Utc>,
    #[serde(default)]
    pub downloaded_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FreshnessData {
    #[serde(default)]
    assignments: BTreeMap<String, ArchiveCacheEntry>,
    #[serde(default = "default_version")]
    cache_version: String,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

impl Default for FreshnessData {
    fn default() -> Self {
        Self {
            assignments: BTreeMap::new(),
            cache_version: default_version(),
            last_updated: Utc::now(),
        }
    }
}

fn default_version() -> String {
    CACHE_VERSION.to_string()
}

/// 提交包新鲜度缓存
#[derive(Debug)]
pub struct ArchiveFreshnessCache {
    path: PathBuf,
    data: FreshnessData,
}

impl ArchiveFreshnessCache {
    /// 加载缓存；文件缺失或损坏时从空缓存开始
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match snapshot::load_snapshot::<FreshnessData>(&path, "提交缓存") {
            Some(data) => {
                info!("✓ 已加载提交缓存: 跟踪 {} 个作业", data.assignments.len());
                data
            }
            None => FreshnessData::default(),
        };
        Self { path, data }
    }

    /// 是否需要重新下载
    ///
    /// 只有缓存记录存在、两边标记都非空且完全相同时返回 `false`
    pub fn needs_refresh(&self, assignment_id: &str, remote_token: Option<&str>) -> bool {
        let Some(entry) = self.data.assignments.get(assignment_id) else {
            debug!("作业 {} 没有缓存记录，需要下载", assignment_id);
            return true;
        };

        let Some(remote) = remote_token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("作业 {} 无法确认远端更新时间，需要下载", assignment_id);
            return true;
        };

        match entry.last_modified.as_deref() {
            Some(cached) if cached == remote => false,
            cached => {
                debug!(
                    "作业 {} 远端已更新 (缓存: {:?}, 远端: {})",
                    assignment_id, cached, remote
                );
                true
            }
        }
    }

    /// 下载并解压成功后写入记录
    pub fn commit(
        &mut self,
        assignment_id: &str,
        assignment_label: &str,
        remote_token: Option<&str>,
        extracted_path: impl Into<PathBuf>,
    ) {
        let entry = ArchiveCacheEntry {
            assignment_name: assignment_label.to_string(),
            last_modified: remote_token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            last_downloaded: Utc::now(),
            downloaded_path: extracted_path.into(),
        };
        debug!("  → 提交缓存已更新: {} -> {}", assignment_id, entry.downloaded_path.display());
        self.data.assignments.insert(assignment_id.to_string(), entry);
    }

    /// 上次解压的位置
    pub fn cached_path(&self, assignment_id: &str) -> Option<&Path> {
        self.data
            .assignments
            .get(assignment_id)
            .map(|entry| entry.downloaded_path.as_path())
    }

    pub fn has_entry(&self, assignment_id: &str) -> bool {
        self.data.assignments.contains_key(assignment_id)
    }

    pub fn entry(&self, assignment_id: &str) -> Option<&ArchiveCacheEntry> {
        self.data.assignments.get(assignment_id)
    }

    /// 删除单个作业的记录并立即保存，下次运行强制重新下载
    pub fn invalidate(&mut self, assignment_id: &str) -> AppResult<()> {
        if self.data.assignments.remove(assignment_id).is_some() {
            info!("🗑 已清除作业 {} 的提交缓存", assignment_id);
            self.persist()?;
        }
        Ok(())
    }

    /// 清空全部记录并立即保存
    pub fn clear_all(&mut self) -> AppResult<()> {
        self.data.assignments.clear();
        info!("🗑 已清空提交缓存");
        self.persist()
    }

    pub fn persist(&mut self) -> AppResult<()> {
        self.data.last_updated = Utc::now();
        snapshot::persist_snapshot(&self.path, &self.data)?;
        info!("✓ 提交缓存已保存到 {}", self.path.display());
        Ok(())
    }

    pub fn tracked_count(&self) -> usize {
        self.data.assignments.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn summary(&self) -> String {
        format!("提交缓存: 跟踪 {} 个作业", self.tracked_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> ArchiveFreshnessCache {
        ArchiveFreshnessCache::load(dir.path().join("submission-cache.json"))
    }

    #[test]
    fn test_matching_token_is_fresh() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.commit("A1", "Multiply", Some("2024-01-01"), "submissions/Multiply");

        assert!(!cache.needs_refresh("A1", Some("2024-01-01")));
        assert!(cache.needs_refresh("A1", Some("2024-02-01")));
    }

    #[test]
    fn test_token_whitespace_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.commit("A1", "Multiply", Some("  Tue, 01 Sep 2026 10:00:00 GMT\r\n"), "submissions/Multiply");

        assert_eq!(
            cache.entry("A1").unwrap().last_modified.as_deref(),
            Some("Tue, 01 Sep 2026 10:00:00 GMT")
        );
        assert!(!cache.needs_refresh("A1", Some("Tue, 01 Sep 2026 10:00:00 GMT ")));

        cache.commit("A2", "Buttons", Some("   "), "submissions/Buttons");
        assert_eq!(cache.entry("A2").unwrap().last_modified, None);
    }

    #[test]
    fn test_unknown_or_blank_tokens_need_refresh() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);

        // 没有记录
        assert!(cache.needs_refresh("A1", Some("2024-01-01")));

        cache.commit("A1", "Multiply", Some("2024-01-01"), "submissions/Multiply");
        assert!(cache.needs_refresh("A1", None));
        assert!(cache.needs_refresh("A1", Some("   ")));

        // 缓存标记为空时也无法确认
        cache.commit("A2", "Buttons", None, "submissions/Buttons");
        assert!(cache.needs_refresh("A2", Some("2024-01-01")));
    }

    #[test]
    fn test_persist_reload_and_snapshot_format() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.commit(
            "8017693698",
            "Constants Variables Datatypes",
            Some("Sat, 11 Oct 2025 15:30:00 GMT"),
            "submissions/Constants_Variables_Datatypes",
        );
        cache.persist().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
        let entry = &raw["assignments"]["8017693698"];
        assert_eq!(entry["assignmentName"], "Constants Variables Datatypes");
        assert_eq!(entry["lastModified"], "Sat, 11 Oct 2025 15:30:00 GMT");
        assert!(entry["lastDownloaded"].is_string());
        assert_eq!(raw["cache_version"], "1.0");

        let reloaded = cache_in(&dir);
        assert!(!reloaded.needs_refresh("8017693698", Some("Sat, 11 Oct 2025 15:30:00 GMT")));
        assert_eq!(
            reloaded.cached_path("8017693698"),
            Some(Path::new("submissions/Constants_Variables_Datatypes"))
        );
    }

    #[test]
    fn test_null_last_modified_loads() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("submission-cache.json"),
            r#"{"assignments": {"A1": {"assignmentName": "Multiply", "lastModified": null,
                "lastDownloaded": "2025-10-11T15:30:00Z", "downloadedPath": "submissions/Multiply"}},
                "cache_version": "1.0", "last_updated": "2025-10-11T15:30:00Z"}"#,
        )
        .unwrap();

        let cache = cache_in(&dir);
        assert!(cache.has_entry("A1"));
        assert!(cache.needs_refresh("A1", Some("anything")));
    }

    #[test]
    fn test_invalidate_and_clear_all() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.commit("A1", "Multiply", Some("t1"), "a");
        cache.commit("A2", "Buttons", Some("t2"), "b");

        cache.invalidate("A1").unwrap();
        assert!(!cache.has_entry("A1"));
        assert_eq!(cache_in(&dir).tracked_count(), 1);

        cache.clear_all().unwrap();
        assert_eq!(cache_in(&dir).summary(), "提交缓存: 跟踪 0 个作业");
    }
}
