//! JSON 快照读写
//!
//! 台账与新鲜度缓存共用的整文件持久化：运行开始时读一次，结束时写一次。
//! 读取失败从空白状态开始；写入失败返回 `CachePersistence` 由调用方记录。

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// 快照格式版本
pub const CACHE_VERSION: &str = "1.0";

/// 读取快照
///
/// 文件不存在或无法解析时返回 `None`，并记录原因
pub fn load_snapshot<T: DeserializeOwned>(path: &Path, label: &str) -> Option<T> {
    if !path.exists() {
        info!("ℹ 未找到{}，创建新的缓存: {}", label, path.display());
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("⚠ 读取{}失败，从空白状态开始: {}", label, e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("⚠ {}已损坏，从空白状态开始: {}", label, e);
            None
        }
    }
}

/// 写入快照，必要时创建父目录
///
/// 先写临时文件再重命名，避免写到一半留下损坏的快照
pub fn persist_snapshot<T: Serialize>(path: &Path, data: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| AppError::cache_persistence(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AppError::cache_persistence(path, e))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).map_err(|e| AppError::cache_persistence(path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| AppError::cache_persistence(path, e))?;

    Ok(())
}
