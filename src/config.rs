use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::AssignmentConfig;

/// 会话 Cookie 文件（分号较多时比环境变量更方便）
pub const SESSION_COOKIE_FILE: &str = ".session-cookie";

/// 台账快照文件名
pub const LEDGER_FILE: &str = "grading-cache.json";

/// 提交新鲜度缓存文件名
pub const FRESHNESS_CACHE_FILE: &str = "submission-cache.json";

/// 教学平台连接配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub session_cookie: String,
    pub csrf_key: Option<String>,
    pub csrf_token: Option<String>,
}

/// 程序配置
///
/// 启动时构造一次，显式传给编排层和各个服务
#[derive(Clone, Debug)]
pub struct Config {
    // --- 评分服务 ---
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    /// 使用本地兼容 OpenAI 协议的模型服务（LM Studio）
    pub use_local_model: bool,
    pub local_model_endpoint: String,
    pub local_model_name: String,
    /// 单次评分调用的超时（秒）
    pub grading_timeout_secs: u64,
    // --- 目录 ---
    /// 台账与缓存快照所在目录
    pub results_dir: PathBuf,
    /// 提交解压 / 手动上传的根目录
    pub submissions_root: PathBuf,
    /// 需要评分的源文件扩展名（不含点）
    pub source_extension: String,
    /// 可选的作业清单文件
    pub assignments_file: PathBuf,
    // --- 提交来源 ---
    pub portal: Option<PortalConfig>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-5-mini".to_string(),
            use_local_model: false,
            local_model_endpoint: "http://localhost:1234/v1".to_string(),
            local_model_name: "qwen3-4b-thinking-2507".to_string(),
            grading_timeout_secs: 600,
            results_dir: PathBuf::from("results"),
            submissions_root: PathBuf::from("submissions"),
            source_extension: "swift".to_string(),
            assignments_file: PathBuf::from("assignments.toml"),
            portal: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从进程环境读取配置（调用前应已加载 `.env`）
    pub fn from_env() -> Result<Self, ConfigError> {
        let cookie_from_file = read_cookie_file(Path::new(SESSION_COOKIE_FILE));
        Self::from_lookup(|key| std::env::var(key).ok(), cookie_from_file)
    }

    /// 从任意键值来源构造配置
    pub fn from_lookup<F>(lookup: F, cookie_from_file: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let session_cookie = cookie_from_file.or_else(|| get("PORTAL_SESSION_COOKIE"));
        let portal = match (get("PORTAL_BASE_URL"), session_cookie) {
            (Some(base_url), Some(session_cookie)) => Some(PortalConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                session_cookie,
                csrf_key: get("PORTAL_CSRF_KEY"),
                csrf_token: get("PORTAL_CSRF_TOKEN"),
            }),
            _ => None,
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: get("OPENAI_API_BASE").unwrap_or(default.openai_api_base),
            openai_model: get("OPENAI_MODEL").unwrap_or(default.openai_model),
            use_local_model: get("USE_LOCAL_MODEL")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(default.use_local_model),
            local_model_endpoint: get("LM_STUDIO_ENDPOINT").unwrap_or(default.local_model_endpoint),
            local_model_name: get("LM_STUDIO_MODEL").unwrap_or(default.local_model_name),
            grading_timeout_secs: match get("GRADING_TIMEOUT_SECS") {
                Some(v) => parse_var("GRADING_TIMEOUT_SECS", &v, "u64")?,
                None => default.grading_timeout_secs,
            },
            results_dir: get("RESULTS_DIR").map(PathBuf::from).unwrap_or(default.results_dir),
            submissions_root: get("SUBMISSIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.submissions_root),
            source_extension: get("SOURCE_EXTENSION")
                .map(|v| v.trim_start_matches('.').to_string())
                .unwrap_or(default.source_extension),
            assignments_file: get("ASSIGNMENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.assignments_file),
            portal,
            verbose_logging: match get("VERBOSE_LOGGING") {
                Some(v) => parse_var("VERBOSE_LOGGING", &v, "bool")?,
                None => default.verbose_logging,
            },
        })
    }

    pub fn grading_timeout(&self) -> Duration {
        Duration::from_secs(self.grading_timeout_secs)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.results_dir.join(LEDGER_FILE)
    }

    pub fn freshness_cache_path(&self) -> PathBuf {
        self.results_dir.join(FRESHNESS_CACHE_FILE)
    }
}

/// 从环境变量读取作业列表
///
/// 变量格式为 `ASSIGNMENT_<n>_ID / _NAME / _PROMPT`，编号从 1 开始连续递增，
/// 遇到第一个缺失的 ID 即停止
pub fn assignments_from_env() -> Result<Vec<AssignmentConfig>, ConfigError> {
    assignments_from_lookup(|key| std::env::var(key).ok())
}

pub fn assignments_from_lookup<F>(lookup: F) -> Result<Vec<AssignmentConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut assignments = Vec::new();

    for index in 1.. {
        let Some(id) = get(&format!("ASSIGNMENT_{}_ID", index)) else {
            break;
        };
        let name_key = format!("ASSIGNMENT_{}_NAME", index);
        let prompt_key = format!("ASSIGNMENT_{}_PROMPT", index);

        let name = get(&name_key).ok_or(ConfigError::IncompleteAssignment {
            index,
            var_name: name_key,
        })?;
        let prompt = get(&prompt_key).ok_or(ConfigError::IncompleteAssignment {
            index,
            var_name: prompt_key,
        })?;

        assignments.push(AssignmentConfig {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            prompt: prompt.trim().to_string(),
        });
    }

    if assignments.is_empty() {
        return Err(ConfigError::NoAssignments);
    }
    Ok(assignments)
}

fn parse_var<T: std::str::FromStr>(
    var_name: &str,
    value: &str,
    expected_type: &str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    })
}

fn read_cookie_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cookie = content.trim().to_string();
            if cookie.is_empty() {
                None
            } else {
                tracing::debug!("从 {} 读取会话 Cookie", path.display());
                Some(cookie)
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = Config::from_lookup(lookup(&[]), None).unwrap();
        assert_eq!(config.openai_model, "gpt-5-mini");
        assert_eq!(config.grading_timeout(), Duration::from_secs(600));
        assert_eq!(config.ledger_path(), PathBuf::from("results/grading-cache.json"));
        assert!(config.portal.is_none());
        assert!(!config.use_local_model);
    }

    #[test]
    fn test_overrides_and_portal() {
        let config = Config::from_lookup(
            lookup(&[
                ("USE_LOCAL_MODEL", "TRUE"),
                ("GRADING_TIMEOUT_SECS", "90"),
                ("SOURCE_EXTENSION", ".kt"),
                ("PORTAL_BASE_URL", "https://lms.example.edu/"),
                ("PORTAL_CSRF_KEY", "key"),
            ]),
            Some("SESS=abc; other=1".to_string()),
        )
        .unwrap();

        assert!(config.use_local_model);
        assert_eq!(config.grading_timeout_secs, 90);
        assert_eq!(config.source_extension, "kt");
        let portal = config.portal.unwrap();
        assert_eq!(portal.base_url, "https://lms.example.edu");
        assert_eq!(portal.session_cookie, "SESS=abc; other=1");
        assert_eq!(portal.csrf_key.as_deref(), Some("key"));
        assert!(portal.csrf_token.is_none());
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = Config::from_lookup(lookup(&[("GRADING_TIMEOUT_SECS", "ten")]), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarParseFailed { .. }));
    }

    #[test]
    fn test_assignments_sequential() {
        let assignments = assignments_from_lookup(lookup(&[
            ("ASSIGNMENT_1_ID", "8017693698"),
            ("ASSIGNMENT_1_NAME", "Multiply"),
            ("ASSIGNMENT_1_PROMPT", "MultiplyPrompt"),
            ("ASSIGNMENT_2_ID", "8017693525"),
            ("ASSIGNMENT_2_NAME", "Buttons"),
            ("ASSIGNMENT_2_PROMPT", "ButtonsPrompt"),
            // 编号不连续，不会被读取
            ("ASSIGNMENT_4_ID", "999"),
        ]))
        .unwrap();

        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[1].name, "Buttons");
    }

    #[test]
    fn test_assignment_missing_prompt() {
        let err = assignments_from_lookup(lookup(&[
            ("ASSIGNMENT_1_ID", "1"),
            ("ASSIGNMENT_1_NAME", "Multiply"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::IncompleteAssignment { index, var_name } => {
                assert_eq!(index, 1);
                assert_eq!(var_name, "ASSIGNMENT_1_PROMPT");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            assignments_from_lookup(lookup(&[])),
            Err(ConfigError::NoAssignments)
        ));
    }
}
