// ==========================================
// 制造执行系统 - 核心库
// ==========================================
// 动态实体模型: 数据定义 -> 校验 -> 存储/查询 -> 表格绑定
// 插件生命周期: 状态机 + 依赖检查 + 状态持久化
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 模型层 - 数据定义、字段类型、实体
pub mod model;

// 校验层 - 字段/实体校验器
pub mod validators;

// 查询层 - 条件、排序、分页
pub mod search;

// 数据仓储层 - 存储与数据访问服务
pub mod repository;

// 表格层 - 视图状态绑定
pub mod grid;

// 插件层 - 生命周期
pub mod plugin;

// 配置层 - 运行配置与模型配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use model::{
    Cascade, DataDefinition, DataDefinitionRef, DataDefinitionService, Entity, EntityList,
    EntityRef, ErrorMessage, FieldDefinition, FieldType, FieldValue, HookRegistry, ModelError,
    ModelResult, ValidationOutcome,
};

pub use search::{Order, Restriction, Restrictions, SearchCriteria, SearchResult};

pub use repository::{
    DataAccess, DataAccessService, EntityStore, MemoryEntityStore, SaveOutcome,
    SqliteEntityStore,
};

pub use grid::{GridColumn, GridState};

pub use plugin::{Plugin, PluginManager, PluginState};

pub use config::{MesSettings, SchemaConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "mes-core";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
