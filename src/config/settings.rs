// ==========================================
// 制造执行系统 - 运行配置
// ==========================================
// 来源优先级: 环境变量 > 配置文件(JSON) > 默认值
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::error::ModelResult;

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "MES_DB_PATH";

/// 语言环境变量
pub const ENV_LOCALE: &str = "MES_LOCALE";

/// 默认表格每页条数
pub const DEFAULT_GRID_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesSettings {
    /// SQLite 数据库文件
    pub db_path: String,

    /// 默认语言（校验消息、数字格式）
    pub locale: String,

    /// 日志过滤（RUST_LOG 未设置时使用）
    pub log_filter: String,

    pub log_format: LogFormat,

    /// 表格默认每页条数
    pub grid_page_size: usize,

    /// 数据模型定义文件（JSON）
    pub schema_path: Option<String>,
}

impl Default for MesSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            locale: "en".to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
            grid_page_size: DEFAULT_GRID_PAGE_SIZE,
            schema_path: None,
        }
    }
}

impl MesSettings {
    /// 从 JSON 文件加载（缺失字段取默认值），再应用环境变量覆写
    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: MesSettings = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "配置文件已加载");
        Ok(settings.apply_env_overrides())
    }

    /// 文件不存在时使用默认值
    pub fn load_or_default(path: Option<&Path>) -> ModelResult<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default().apply_env_overrides()),
        }
    }

    pub fn apply_env_overrides(self) -> Self {
        self.with_overrides(env_value(ENV_DB_PATH), env_value(ENV_LOCALE))
    }

    fn with_overrides(mut self, db_path: Option<String>, locale: Option<String>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(locale) = locale {
            self.locale = locale;
        }
        self
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 默认数据库路径: 用户数据目录/mes-core/mes.db（无数据目录时为当前目录）
pub fn default_db_path() -> String {
    let mut path = PathBuf::from("./mes.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("mes-core");
        // 目录创建失败时由打开数据库时报告
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("mes.db");
    }

    path.to_string_lossy().to_string()
}
